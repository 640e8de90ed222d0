//! Apply command: run one headless file-to-file edit.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, bail};

use imgsdk_core::{
    Completion, CompletionQueue, CorrelationToken, NativeEngine, RenderSession, SessionOptions,
};

/// Run one edit and block until its completion arrives.
pub fn execute(
    input: &str,
    output: &str,
    cmd: &str,
    engine_path: Option<&str>,
) -> anyhow::Result<()> {
    let start = Instant::now();

    let engine = NativeEngine::global(engine_path.map(Path::new))
        .context("failed to load the engine library")?;

    let session = RenderSession::create(Arc::new(engine), SessionOptions::default())
        .context("failed to create render session")?;
    session.set_input_path(input)?;
    session.set_output_path(output)?;
    session.set_effect_cmd(cmd)?;

    let queue = CompletionQueue::new();
    session.execute(Arc::new(queue.listener()), CorrelationToken(0))?;

    let Some(completion) = queue.recv() else {
        bail!("completion channel closed without a result");
    };

    session.destroy()?;

    match completion {
        Completion::Success { output, .. } => {
            println!(
                "Edit completed in {:.2}s, output written to {}",
                start.elapsed().as_secs_f64(),
                output.display()
            );
            Ok(())
        }
        Completion::Failure { diagnostic, .. } => bail!("edit failed: {diagnostic}"),
    }
}

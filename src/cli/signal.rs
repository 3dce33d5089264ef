//! Closing the capture session on SIGINT/SIGTERM.

use std::future::Future;
use std::io;
use std::thread::{self, JoinHandle};

use tokio::runtime::{Builder, Runtime};
use tracing::info;

use crate::capture::CloseHandle;

/// Close `handle` once the process receives SIGINT or SIGTERM.
///
/// The handlers are registered before this returns. The signal is awaited on
/// a background thread, after which reads on the session return `Closed` and
/// the pipeline drains normally.
pub fn close_on_signal(handle: CloseHandle) -> io::Result<JoinHandle<()>> {
    let runtime = Builder::new_current_thread().enable_all().build()?;
    let signal = {
        let _guard = runtime.enter();
        shutdown_signal()?
    };
    watch(runtime, signal, handle)
}

fn watch<F>(runtime: Runtime, signal: F, handle: CloseHandle) -> io::Result<JoinHandle<()>>
where
    F: Future<Output = ()> + Send + 'static,
{
    thread::Builder::new()
        .name("signal".into())
        .spawn(move || {
            runtime.block_on(signal);
            handle.close();
        })
}

#[cfg(unix)]
fn shutdown_signal() -> io::Result<impl Future<Output = ()>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;
    Ok(async move {
        tokio::select! {
            _ = interrupt.recv() => info!("received SIGINT, closing capture"),
            _ = terminate.recv() => info!("received SIGTERM, closing capture"),
        }
    })
}

#[cfg(not(unix))]
fn shutdown_signal() -> io::Result<impl Future<Output = ()>> {
    Ok(async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("received Ctrl-C, closing capture"),
            Err(e) => {
                tracing::warn!(error = %e, "cannot listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        }
    })
}

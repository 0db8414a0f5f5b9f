//! `favdl cancel` – ask a running `favdl download` to stop.

use anyhow::Result;

#[cfg(unix)]
pub async fn run_cancel() -> Result<()> {
    let path = favdl_core::control::default_control_socket_path()?;
    if crate::cli::control_socket::send_cancel(&path).await? {
        println!("Cancel requested.");
    } else {
        println!("No download running.");
    }
    Ok(())
}

#[cfg(not(unix))]
pub async fn run_cancel() -> Result<()> {
    anyhow::bail!("cancel is only supported on Unix; press Ctrl-C in the downloading terminal")
}

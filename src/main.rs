use reactor_echo::{Runtime, ServerConfig, serve, signal};

use std::process::ExitCode;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> reactor_echo::Result<()> {
    let mut runtime = Runtime::new()?;
    let handle = runtime.handle();

    signal::stop_on_shutdown(&handle)?;
    serve(&handle, ServerConfig::default())?;

    runtime.run()?;
    log::info!("shut down");
    Ok(())
}

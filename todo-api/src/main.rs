use std::path::Path;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = todo_api::config::Config::from_env()?;
    let _log_guard = todo_api::logging::init(Path::new(&config.log_directory))?;
    todo_api::web::start_web_server(config).await
}

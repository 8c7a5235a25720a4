use std::time::Duration;

use rest_query::{Method, RequestBuilder, RestQueryResult, TransferOption};

fn run() -> RestQueryResult<()> {
    let mut query = RequestBuilder::new(Some("https://httpbin.org/post"))?;
    query
        .set_method(Method::Post)?
        .set_data("name=rest_query&kind=demo")?
        .set_auth("demo", "secret")?
        .set_transfer_options([
            TransferOption::ConnectTimeout(Duration::from_secs(5)),
            TransferOption::Timeout(Duration::from_secs(15)),
            TransferOption::FailOnError(true),
        ])?;

    let body = query.execute()?;
    log::info!("response = {}", String::from_utf8_lossy(body));
    Ok(())
}

fn main() {
    // init logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();

    if let Err(e) = run() {
        log::error!("{e}");
        std::process::exit(1);
    }
}

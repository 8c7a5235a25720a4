use rest_query::{Method, RequestBuilder};

fn main() {
    // init logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();

    let mut query = RequestBuilder::new(None).expect("transfer capability unavailable");
    query
        .set_method(Method::Get)
        .and_then(|query| query.set_url("https://www.google.com/"))
        .and_then(|query| query.set_header("User-Agent", "rest_query/1.0"))
        .and_then(|query| query.follow_redirects(true))
        .expect("Failed to configure request");

    // Get the response
    query.execute().expect("request failed");
    log::info!("info = {:?}", query.info());
    log::info!("response = {}", query.result_text().unwrap_or_default());
}

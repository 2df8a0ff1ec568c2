use url::Url;

const INVALID_SCHEME: &str = "endpoint url scheme must be https:// or http:// .";

pub fn check_scheme(url: &str) -> Result<String, String> {
    let parsed = Url::parse(url).map_err(|e| e.to_string())?;

    match parsed.scheme() {
        "https" | "http" => Ok(url.to_string()),
        _ => Err(INVALID_SCHEME.to_string()),
    }
}

//! URL construction for direct and delegated (Vertex AI) addressing

/// Join a base URL and a path, tolerating a trailing `/` on the base.
pub fn join_url(base: &str, path: &str) -> String {
    format!("{}{}", base.trim_end_matches('/'), path)
}

/// Build the Vertex AI raw-predict URL for an Anthropic model.
///
/// Delegated mode addresses the model through the project/location pair;
/// callers in this mode never consult a base URL.
///
/// - `https://{location}-aiplatform.googleapis.com/v1/projects/{project}/locations/{location}/publishers/anthropic/models/{model}:streamRawPredict`
/// - For `global`, the un-prefixed `aiplatform.googleapis.com` host is used.
pub fn vertex_predict_url(project: &str, location: &str, model: &str) -> String {
    let host = if location == "global" {
        "aiplatform.googleapis.com".to_string()
    } else {
        format!("{location}-aiplatform.googleapis.com")
    };
    format!(
        "https://{host}/v1/projects/{project}/locations/{location}/publishers/anthropic/models/{model}:streamRawPredict"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_url_trims_trailing_slash() {
        assert_eq!(
            join_url("https://api.anthropic.com/v1/", "/messages"),
            "https://api.anthropic.com/v1/messages"
        );
        assert_eq!(
            join_url("https://api.anthropic.com/v1", "/complete"),
            "https://api.anthropic.com/v1/complete"
        );
    }

    #[test]
    fn test_vertex_predict_url() {
        let url = vertex_predict_url("my-project", "us-central1", "claude-3-haiku@20240307");
        assert_eq!(
            url,
            "https://us-central1-aiplatform.googleapis.com/v1/projects/my-project/locations/us-central1/publishers/anthropic/models/claude-3-haiku@20240307:streamRawPredict"
        );

        let global = vertex_predict_url("my-project", "global", "claude-3-haiku@20240307");
        assert_eq!(
            global,
            "https://aiplatform.googleapis.com/v1/projects/my-project/locations/global/publishers/anthropic/models/claude-3-haiku@20240307:streamRawPredict"
        );
    }
}

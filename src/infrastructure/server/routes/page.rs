use super::super::state::ServerState;
use crate::application::tooling::ListingConnector;
use crate::infrastructure::model::ModelClient;
use axum::extract::State;
use axum::response::Html;
use std::sync::Arc;

const PAGE_TEMPLATE: &str = include_str!("../assets/page.html");

pub async fn page_handler<M, C>(State(state): State<Arc<ServerState<M, C>>>) -> Html<String>
where
    M: ModelClient,
    C: ListingConnector,
{
    Html(PAGE_TEMPLATE.replace("{{default_query}}", &escape_attribute(state.default_query())))
}

/// Minimal escaping for text placed inside an HTML attribute value.
fn escape_attribute(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_attribute_metacharacters() {
        assert_eq!(
            escape_attribute(r#"rooms for <2> "adults" & a dog"#),
            "rooms for &lt;2&gt; &quot;adults&quot; &amp; a dog"
        );
    }

    #[test]
    fn template_has_the_default_query_placeholder() {
        assert!(PAGE_TEMPLATE.contains("{{default_query}}"));
    }
}

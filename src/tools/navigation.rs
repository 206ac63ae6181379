//! Reference-family tools: usages, definitions and implementations.

use lsp_types::{GotoDefinitionResponse, Location, Position, Uri};
use serde::Serialize;

use crate::codec::{WireLocation, WireRange};
use crate::error::{ToolError, ToolResult};
use crate::preview::resolve_preview;
use crate::tools::{ToolContext, ToolName};

/// A resolved location with the trimmed source line at its start.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reference {
    pub uri: String,
    pub range: WireRange,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
}

pub async fn find_usages(
    cx: ToolContext<'_>,
    uri: &Uri,
    position: Position,
) -> ToolResult<Vec<Reference>> {
    let locations = cx
        .provider
        .references(uri, position)
        .await
        .map_err(|err| ToolError::provider(ToolName::FindUsages.as_str(), err))?
        .unwrap_or_default();
    Ok(with_previews(cx, locations).await)
}

pub async fn go_to_definition(
    cx: ToolContext<'_>,
    uri: &Uri,
    position: Position,
) -> ToolResult<Vec<WireLocation>> {
    let response = cx
        .provider
        .definition(uri, position)
        .await
        .map_err(|err| ToolError::provider(ToolName::GoToDefinition.as_str(), err))?;
    Ok(normalize_targets(response)
        .iter()
        .map(WireLocation::from)
        .collect())
}

pub async fn find_implementations(
    cx: ToolContext<'_>,
    uri: &Uri,
    position: Position,
) -> ToolResult<Vec<Reference>> {
    let response = cx
        .provider
        .implementations(uri, position)
        .await
        .map_err(|err| ToolError::provider(ToolName::FindImplementations.as_str(), err))?;
    Ok(with_previews(cx, normalize_targets(response)).await)
}

/// Flattens the three definition response shapes into plain locations.
///
/// `LocationLink` entries keep their full target range, not the selection
/// range, so previews land on the first line of the declaration.
fn normalize_targets(response: Option<GotoDefinitionResponse>) -> Vec<Location> {
    match response {
        None => Vec::new(),
        Some(GotoDefinitionResponse::Scalar(location)) => vec![location],
        Some(GotoDefinitionResponse::Array(locations)) => locations,
        Some(GotoDefinitionResponse::Link(links)) => links
            .into_iter()
            .map(|link| Location::new(link.target_uri, link.target_range))
            .collect(),
    }
}

/// Resolves previews one location at a time. A failed preview only drops the
/// `preview` field of its own entry.
async fn with_previews(cx: ToolContext<'_>, locations: Vec<Location>) -> Vec<Reference> {
    let mut references = Vec::with_capacity(locations.len());
    for location in locations {
        let preview = resolve_preview(cx.store, &location.uri, location.range.start.line).await;
        let WireLocation { uri, range } = WireLocation::from(&location);
        references.push(Reference {
            uri,
            range,
            preview,
        });
    }
    references
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::WirePosition;
    use crate::tools::fake::{FakeProvider, FakeStore, location, range, uri};
    use lsp_types::LocationLink;

    const A: &str = "file:///src/a.rs";
    const B: &str = "file:///src/b.rs";

    fn store() -> FakeStore {
        FakeStore::new()
            .with_document(A, "rust", "fn a() {}\n\n    let x = b();\n")
            .with_document(B, "rust", "pub fn b() -> u8 {\n    7\n}\n")
    }

    #[tokio::test]
    async fn usages_keep_locations_whose_preview_fails() {
        let provider = FakeProvider {
            references: Some(vec![
                location(A, 2),
                location("file:///src/gone.rs", 0),
                location(B, 0),
            ]),
            ..FakeProvider::new()
        };
        let store = store();
        let cx = ToolContext {
            provider: &provider,
            store: &store,
        };

        let refs = find_usages(cx, &uri(A), Position::new(0, 3)).await.unwrap();
        assert_eq!(refs.len(), 3);
        assert_eq!(refs[0].preview.as_deref(), Some("let x = b();"));
        assert_eq!(refs[1].uri, "file:///src/gone.rs");
        assert_eq!(refs[1].preview, None);
        assert_eq!(refs[2].preview.as_deref(), Some("pub fn b() -> u8 {"));
        assert_eq!(refs[2].range.start, WirePosition { line: 0, character: 4 });
    }

    #[tokio::test]
    async fn missing_preview_is_omitted_from_json() {
        let provider = FakeProvider {
            references: Some(vec![location("file:///src/gone.rs", 1)]),
            ..FakeProvider::new()
        };
        let store = store();
        let cx = ToolContext {
            provider: &provider,
            store: &store,
        };
        let refs = find_usages(cx, &uri(A), Position::new(0, 0)).await.unwrap();
        let json = serde_json::to_value(&refs).unwrap();
        assert!(json[0].get("preview").is_none());
        assert_eq!(json[0]["range"]["end"]["character"], 9);
    }

    #[tokio::test]
    async fn no_references_is_empty_not_error() {
        let provider = FakeProvider::new();
        let store = store();
        let cx = ToolContext {
            provider: &provider,
            store: &store,
        };
        let refs = find_usages(cx, &uri(A), Position::new(0, 0)).await.unwrap();
        assert!(refs.is_empty());
    }

    #[tokio::test]
    async fn definition_accepts_links_without_previews() {
        let provider = FakeProvider {
            definition: Some(GotoDefinitionResponse::Link(vec![LocationLink {
                origin_selection_range: None,
                target_uri: uri(B),
                target_range: range(0, 0, 2, 1),
                target_selection_range: range(0, 7, 0, 8),
            }])),
            ..FakeProvider::new()
        };
        let store = store();
        let cx = ToolContext {
            provider: &provider,
            store: &store,
        };
        let targets = go_to_definition(cx, &uri(A), Position::new(2, 12)).await.unwrap();
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].uri, B);
        assert_eq!(targets[0].range.end, WirePosition { line: 2, character: 1 });
        let json = serde_json::to_value(&targets).unwrap();
        assert!(json[0].get("preview").is_none());
    }

    #[tokio::test]
    async fn implementations_preview_their_own_document() {
        let provider = FakeProvider {
            implementations: Some(GotoDefinitionResponse::Scalar(location(B, 1))),
            ..FakeProvider::new()
        };
        let store = store();
        let cx = ToolContext {
            provider: &provider,
            store: &store,
        };
        let impls = find_implementations(cx, &uri(A), Position::new(0, 3)).await.unwrap();
        assert_eq!(impls.len(), 1);
        assert_eq!(impls[0].preview.as_deref(), Some("7"));
    }

    #[tokio::test]
    async fn provider_fault_is_a_tool_error() {
        let provider = FakeProvider::new().failing("definition");
        let store = store();
        let cx = ToolContext {
            provider: &provider,
            store: &store,
        };
        let err = go_to_definition(cx, &uri(A), Position::new(0, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Provider { tool: "go_to_definition", .. }));
    }
}

//! Call and type hierarchies: prepare at a position, then expand both sides.

use lsp_types::{
    CallHierarchyIncomingCall, CallHierarchyItem, CallHierarchyOutgoingCall, Position, Range,
    SymbolKind, TypeHierarchyItem, Uri,
};
use serde::Serialize;

use crate::codec::WireRange;
use crate::error::{ToolError, ToolResult};
use crate::tools::{ToolContext, ToolName};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HierarchyNode {
    pub name: String,
    pub kind: SymbolKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub uri: String,
    pub range: WireRange,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomingEdge {
    pub from: HierarchyNode,
    pub from_ranges: Vec<WireRange>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutgoingEdge {
    pub to: HierarchyNode,
    pub from_ranges: Vec<WireRange>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallHierarchyView {
    pub item: HierarchyNode,
    pub incoming_calls: Option<Vec<IncomingEdge>>,
    pub outgoing_calls: Option<Vec<OutgoingEdge>>,
    /// Other prepare candidates at the same position, not expanded.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub alternatives: Vec<HierarchyNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeHierarchyView {
    pub item: HierarchyNode,
    pub supertypes: Option<Vec<HierarchyNode>>,
    pub subtypes: Option<Vec<HierarchyNode>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub alternatives: Vec<HierarchyNode>,
}

pub async fn call_hierarchy(
    cx: ToolContext<'_>,
    uri: &Uri,
    position: Position,
) -> ToolResult<Option<CallHierarchyView>> {
    const TOOL: &str = ToolName::GetCallHierarchy.as_str();

    let candidates = cx
        .provider
        .prepare_call_hierarchy(uri, position)
        .await
        .map_err(|err| ToolError::provider(TOOL, err))?
        .unwrap_or_default();
    let mut candidates = candidates.into_iter();
    let Some(root) = candidates.next() else {
        tracing::debug!(uri = %uri.as_str(), "No call hierarchy item at position");
        return Ok(None);
    };

    let (incoming, outgoing) = tokio::join!(
        cx.provider.incoming_calls(&root),
        cx.provider.outgoing_calls(&root)
    );
    let incoming = incoming.map_err(|err| ToolError::provider(TOOL, err))?;
    let outgoing = outgoing.map_err(|err| ToolError::provider(TOOL, err))?;

    Ok(Some(CallHierarchyView {
        item: call_node(&root),
        incoming_calls: incoming.map(|calls| calls.iter().map(incoming_edge).collect()),
        outgoing_calls: outgoing.map(|calls| calls.iter().map(outgoing_edge).collect()),
        alternatives: candidates.map(|item| call_node(&item)).collect(),
    }))
}

pub async fn type_hierarchy(
    cx: ToolContext<'_>,
    uri: &Uri,
    position: Position,
) -> ToolResult<Option<TypeHierarchyView>> {
    const TOOL: &str = ToolName::GetTypeHierarchy.as_str();

    let candidates = cx
        .provider
        .prepare_type_hierarchy(uri, position)
        .await
        .map_err(|err| ToolError::provider(TOOL, err))?
        .unwrap_or_default();
    let mut candidates = candidates.into_iter();
    let Some(root) = candidates.next() else {
        tracing::debug!(uri = %uri.as_str(), "No type hierarchy item at position");
        return Ok(None);
    };

    let (supertypes, subtypes) = tokio::join!(
        cx.provider.supertypes(&root),
        cx.provider.subtypes(&root)
    );
    let supertypes = supertypes.map_err(|err| ToolError::provider(TOOL, err))?;
    let subtypes = subtypes.map_err(|err| ToolError::provider(TOOL, err))?;

    Ok(Some(TypeHierarchyView {
        item: type_node(&root),
        supertypes: supertypes.map(|items| items.iter().map(type_node).collect()),
        subtypes: subtypes.map(|items| items.iter().map(type_node).collect()),
        alternatives: candidates.map(|item| type_node(&item)).collect(),
    }))
}

fn call_node(item: &CallHierarchyItem) -> HierarchyNode {
    HierarchyNode {
        name: item.name.clone(),
        kind: item.kind,
        detail: item.detail.clone(),
        uri: item.uri.as_str().to_string(),
        range: item.range.into(),
    }
}

fn type_node(item: &TypeHierarchyItem) -> HierarchyNode {
    HierarchyNode {
        name: item.name.clone(),
        kind: item.kind,
        detail: item.detail.clone(),
        uri: item.uri.as_str().to_string(),
        range: item.range.into(),
    }
}

fn incoming_edge(call: &CallHierarchyIncomingCall) -> IncomingEdge {
    IncomingEdge {
        from: call_node(&call.from),
        from_ranges: wire_ranges(&call.from_ranges),
    }
}

fn outgoing_edge(call: &CallHierarchyOutgoingCall) -> OutgoingEdge {
    OutgoingEdge {
        to: call_node(&call.to),
        from_ranges: wire_ranges(&call.from_ranges),
    }
}

fn wire_ranges(ranges: &[Range]) -> Vec<WireRange> {
    ranges.iter().copied().map(WireRange::from).collect()
}

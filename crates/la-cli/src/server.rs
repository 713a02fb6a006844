use std::sync::Arc;

use la_core::ExprId;
use la_store::{StoreError, Workspace};
use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::*;
use rmcp::{ErrorData as McpError, ServerHandler, tool, tool_handler, tool_router};
use schemars::JsonSchema;
use serde::Deserialize;
use tokio::sync::Mutex;

const DEFAULT_HISTORY_LIMIT: usize = 20;

#[derive(Clone)]
pub struct LaServer {
    workspace: Arc<Mutex<Workspace>>,
    /// Owner recorded when a request does not name one.
    owner: String,
    tool_router: ToolRouter<Self>,
}

impl LaServer {
    pub fn new(workspace: Workspace, owner: &str) -> Self {
        Self {
            workspace: Arc::new(Mutex::new(workspace)),
            owner: owner.to_string(),
            tool_router: Self::tool_router(),
        }
    }

    fn stats_json(workspace: &Workspace) -> Result<serde_json::Value, McpError> {
        let store = workspace.store();
        let count = store.count().map_err(internal)?;
        let (entries, hits) = store.cache_stats().map_err(internal)?;
        Ok(serde_json::json!({
            "expressions": count,
            "cache_entries": entries,
            "cache_hits": hits,
        }))
    }
}

fn internal(e: StoreError) -> McpError {
    McpError::internal_error(e.to_string(), None)
}

fn json_result(json: &serde_json::Value) -> CallToolResult {
    CallToolResult::success(vec![Content::text(
        serde_json::to_string_pretty(json).unwrap_or_default(),
    )])
}

/// Expression failures are reported to the caller as tool errors carrying
/// the error kind; storage failures become protocol errors.
fn store_failure(e: StoreError) -> Result<CallToolResult, McpError> {
    match e {
        StoreError::Expression(err) => {
            let json = serde_json::json!({
                "error": { "kind": err.kind().as_str(), "message": err.to_string() },
            });
            Ok(CallToolResult::error(vec![Content::text(
                serde_json::to_string_pretty(&json).unwrap_or_default(),
            )]))
        }
        StoreError::NotFound(_) => Err(McpError::invalid_params(e.to_string(), None)),
        other => Err(internal(other)),
    }
}

// --- Tool parameter types ---

#[derive(Debug, Deserialize, JsonSchema)]
struct EvalRequest {
    /// Expression text, e.g. "Inv([[1,2],[3,4]]) * [1,0]"
    text: String,
    /// Store the expression for history and suggestions (default true)
    store: Option<bool>,
    /// Owner to record on the stored expression
    owner: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct SuggestRequest {
    /// UUIDs of stored expressions to find neighbours for
    ids: Vec<String>,
    /// Number of suggestions; defaults to the configured count
    k: Option<usize>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct HistoryRequest {
    /// Maximum number of expressions to return, newest first
    limit: Option<usize>,
}

#[tool_router]
impl LaServer {
    #[tool(
        description = "Evaluate a linear-algebra expression over scalars, vectors and matrices. Supports + - * / and postfix ' (transpose), plus the functions Det, Inv, Trace, Norm, Dot and Cross. Inside brackets, elements are separated by commas or spaces, and a minus with a space before it but none after it starts a new element: [1 -2] has two elements while [1 - 2] and [1-2] have one. Returns the canonical value text, the nested form, the shape and, when stored, the expression id. Failures return an error with a kind such as parse, dimension or singular."
    )]
    async fn la_eval(
        &self,
        Parameters(req): Parameters<EvalRequest>,
    ) -> Result<CallToolResult, McpError> {
        let workspace = self.workspace.lock().await;
        let owner = req.owner.as_deref().unwrap_or(&self.owner);
        let outcome = match workspace.eval(&req.text, owner, req.store.unwrap_or(true)) {
            Ok(outcome) => outcome,
            Err(e) => return store_failure(e),
        };

        let result = serde_json::json!({
            "value": outcome.canonical,
            "nested": outcome.value.nested_text(),
            "shape": outcome.value.shape().to_string(),
            "id": outcome.record.as_ref().map(|r| r.id.to_string()),
            "cached": outcome.cached,
        });
        Ok(json_result(&result))
    }

    #[tool(
        description = "Suggest stored expressions similar to the given ones. Candidates must share the target's result shape and are ranked by shared operations and value magnitude. The targets themselves are never returned."
    )]
    async fn la_suggest(
        &self,
        Parameters(req): Parameters<SuggestRequest>,
    ) -> Result<CallToolResult, McpError> {
        let ids: Vec<ExprId> = req
            .ids
            .iter()
            .map(|s| {
                ExprId::parse_str(s).map_err(|e| {
                    McpError::invalid_params(format!("invalid expression id '{s}': {e}"), None)
                })
            })
            .collect::<Result<_, _>>()?;
        if ids.is_empty() {
            return Err(McpError::invalid_params(
                "at least one expression id is required".to_string(),
                None,
            ));
        }

        let workspace = self.workspace.lock().await;
        let suggestions = match workspace.suggest(&ids, req.k) {
            Ok(s) => s,
            Err(e) => return store_failure(e),
        };

        let items: Vec<serde_json::Value> = suggestions
            .iter()
            .map(|s| {
                serde_json::json!({
                    "id": s.record.id.to_string(),
                    "source": s.record.source,
                    "value": s.record.canonical,
                    "score": s.score,
                })
            })
            .collect();
        Ok(json_result(&serde_json::json!({ "suggestions": items })))
    }

    #[tool(description = "List stored expressions, newest first.")]
    async fn la_history(
        &self,
        Parameters(req): Parameters<HistoryRequest>,
    ) -> Result<CallToolResult, McpError> {
        let workspace = self.workspace.lock().await;
        let records = workspace
            .store()
            .list(req.limit.unwrap_or(DEFAULT_HISTORY_LIMIT))
            .map_err(internal)?;

        let items: Vec<serde_json::Value> = records
            .iter()
            .map(|r| {
                serde_json::json!({
                    "id": r.id.to_string(),
                    "source": r.source,
                    "value": r.canonical,
                    "owner": r.owner,
                    "created_at": r.created_at,
                })
            })
            .collect();
        Ok(json_result(&serde_json::json!({ "expressions": items })))
    }

    #[tool(description = "Report the number of stored expressions and evaluation cache usage.")]
    async fn la_stats(&self) -> Result<CallToolResult, McpError> {
        let workspace = self.workspace.lock().await;
        Ok(json_result(&Self::stats_json(&workspace)?))
    }
}

#[tool_handler]
impl ServerHandler for LaServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Linear-algebra expression evaluator.\n\n\
                 - Call la_eval to compute an expression. Vectors are written [1,2,3] or [1 2 3]; \
                   matrices are written [[1,2],[3,4]]. Inside brackets [1 -2] is two elements, \
                   [1 - 2] is one. Results are stored unless store is false.\n\
                 - Call la_suggest with ids returned by la_eval to find related stored expressions.\n\
                 - la_history lists recent expressions; la_stats reports store size."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

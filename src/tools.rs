//! Tool-style endpoints.
//!
//! This module defines the tools that automation (and the HTTP API) can
//! call by name with JSON arguments. Every call yields a [`ToolResult`];
//! bad arguments are reported in it rather than raised.

use crate::coordinator::{filter_payload, AggregateReport};
use crate::error::CricketError;
use crate::models::{Focus, Format, Query, SourceResult};
use crate::service::CricketService;
use serde::Serialize;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tracing::debug;

const DEFAULT_SEARCH_LIMIT: usize = 10;

/// Tool definition in function-calling form.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    #[serde(rename = "type")]
    pub tool_type: String,
    pub function: FunctionDefinition,
}

#[derive(Debug, Clone, Serialize)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Result of executing a tool.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolResult {
    pub success: bool,
    pub output: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolResult {
    pub fn success(output: Value) -> Self {
        Self {
            success: true,
            output,
            error: None,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            output: Value::Null,
            error: Some(message),
        }
    }
}

/// Executes tool calls against the service.
#[derive(Clone)]
pub struct ToolExecutor {
    service: CricketService,
}

impl ToolExecutor {
    pub fn new(service: CricketService) -> Self {
        Self { service }
    }

    /// Execute a tool call and return the result.
    pub async fn execute(&self, name: &str, args: &Value, cancel: &CancellationToken) -> ToolResult {
        debug!("Executing tool: {} with args: {}", name, args);

        let result = match name {
            "get_player_comprehensive_stats" => self.player_stats(args, None, cancel).await,
            "get_player_batting_stats" => self.player_stats(args, Some(Focus::Batting), cancel).await,
            "get_player_bowling_stats" => self.player_stats(args, Some(Focus::Bowling), cancel).await,
            "get_player_fielding_stats" => {
                self.player_stats(args, Some(Focus::Fielding), cancel).await
            }
            "search_players" => self.search_players(args).await,
            "get_player_basic_info" => self.basic_info(args, cancel).await,
            "compare_players" => self.compare_players(args, cancel).await,
            _ => Err(format!("Unknown tool: {}", name)),
        };

        match result {
            Ok(output) => ToolResult::success(output),
            Err(message) => ToolResult::error(message),
        }
    }

    async fn player_stats(
        &self,
        args: &Value,
        focus: Option<Focus>,
        cancel: &CancellationToken,
    ) -> Result<Value, String> {
        let player = required_str(args, "player")?;
        let format = format_arg(args)?;
        let query = Query::new(&player, format).map_err(|e| e.to_string())?;

        let report = self
            .service
            .collect(&query, cancel)
            .await
            .map_err(|e| e.to_string())?;
        Ok(report_json(&report, focus))
    }

    async fn search_players(&self, args: &Value) -> Result<Value, String> {
        let query = required_str(args, "query")?;
        let limit = match args.get("limit") {
            None | Some(Value::Null) => DEFAULT_SEARCH_LIMIT,
            Some(value) => value
                .as_u64()
                .ok_or_else(|| "Argument 'limit' must be a non-negative integer".to_string())?
                as usize,
        };

        let players = self.service.search_players(&query, limit).await;
        Ok(json!({
            "query": query,
            "count": players.len(),
            "players": players,
        }))
    }

    async fn basic_info(&self, args: &Value, cancel: &CancellationToken) -> Result<Value, String> {
        let player = required_str(args, "player")?;
        let info = self
            .service
            .player_info(&player, cancel)
            .await
            .map_err(|e| e.to_string())?
            .ok_or_else(|| format!("No profile found for '{}'", player))?;
        Ok(json!({
            "player": player,
            "name": info.name,
            "role": info.role,
            "team": info.team,
        }))
    }

    async fn compare_players(&self, args: &Value, cancel: &CancellationToken) -> Result<Value, String> {
        let player1 = required_str(args, "player1")?;
        let player2 = required_str(args, "player2")?;
        let format = format_arg(args)?;
        let first = Query::new(&player1, format).map_err(|e| e.to_string())?;
        let second = Query::new(&player2, format).map_err(|e| e.to_string())?;

        let (first, second) = tokio::join!(
            self.service.collect(&first, cancel),
            self.service.collect(&second, cancel)
        );
        let (first, second) = (
            first.map_err(|e| e.to_string())?,
            second.map_err(|e| e.to_string())?,
        );

        Ok(json!({
            "format": format,
            "player1": comparison_side(&first),
            "player2": comparison_side(&second),
        }))
    }
}

fn required_str(args: &Value, key: &str) -> Result<String, String> {
    match args.get(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        Some(Value::String(_)) => Err(format!("Argument '{}' must not be empty", key)),
        Some(_) => Err(format!("Argument '{}' must be a string", key)),
        None => Err(format!("Missing required argument '{}'", key)),
    }
}

fn format_arg(args: &Value) -> Result<Format, String> {
    match args.get("format") {
        None | Some(Value::Null) => Ok(Format::All),
        Some(Value::String(s)) => s.parse().map_err(|e: CricketError| e.to_string()),
        Some(_) => Err("Argument 'format' must be a string".to_string()),
    }
}

fn result_json(result: &SourceResult, focus: Option<Focus>) -> Value {
    let payload = match focus {
        Some(focus) => filter_payload(result.payload(), focus),
        None => result.payload().clone(),
    };
    json!({
        "source": result.source(),
        "source_name": result.source().display_name(),
        "status": result.status(),
        "payload": payload,
        "note": result.note(),
    })
}

fn report_json(report: &AggregateReport, focus: Option<Focus>) -> Value {
    let results: Vec<Value> = report
        .results()
        .iter()
        .map(|r| result_json(r, focus))
        .collect();
    let mut output = json!({
        "player": report.query().player,
        "format": report.query().format,
        "successful": report.successful(),
        "total": report.total(),
        "summary": report.summary_line(),
        "results": results,
    });
    if let Some(focus) = focus {
        output["focus"] = json!(focus);
    }
    output
}

fn comparison_side(report: &AggregateReport) -> Value {
    json!({
        "report": report_json(report, None),
        "primary": report.primary().map(|r| result_json(r, None)),
    })
}

fn player_parameters(description: &str) -> Value {
    json!({
        "type": "object",
        "properties": {
            "player": {
                "type": "string",
                "description": description
            },
            "format": {
                "type": "string",
                "enum": ["test", "odi", "t20", "all"],
                "description": "Cricket format (default: all)"
            }
        },
        "required": ["player"]
    })
}

fn definition(name: &str, description: &str, parameters: Value) -> ToolDefinition {
    ToolDefinition {
        tool_type: "function".to_string(),
        function: FunctionDefinition {
            name: name.to_string(),
            description: description.to_string(),
            parameters,
        },
    }
}

/// Get all tool definitions.
pub fn get_tool_definitions() -> Vec<ToolDefinition> {
    vec![
        definition(
            "get_player_comprehensive_stats",
            "Get statistics for a player from every data source, with the status of each source.",
            player_parameters("Full player name, e.g. 'Virat Kohli'"),
        ),
        definition(
            "search_players",
            "Search for players by name. Returns matching player names.",
            json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Full or partial player name"
                    },
                    "limit": {
                        "type": "integer",
                        "minimum": 1,
                        "maximum": 50,
                        "description": "Maximum number of results (default: 10)"
                    }
                },
                "required": ["query"]
            }),
        ),
        definition(
            "get_player_basic_info",
            "Get a player's full name, playing role and team from their ESPN Cricinfo profile.",
            json!({
                "type": "object",
                "properties": {
                    "player": {
                        "type": "string",
                        "description": "Full or partial player name"
                    }
                },
                "required": ["player"]
            }),
        ),
        definition(
            "get_player_batting_stats",
            "Get batting statistics for a player from every data source.",
            player_parameters("Full player name"),
        ),
        definition(
            "get_player_bowling_stats",
            "Get bowling statistics for a player from every data source.",
            player_parameters("Full player name"),
        ),
        definition(
            "get_player_fielding_stats",
            "Get fielding statistics (catches, stumpings) for a player from every data source.",
            player_parameters("Full player name"),
        ),
        definition(
            "compare_players",
            "Collect statistics for two players and return both reports with each player's primary stat sheet.",
            json!({
                "type": "object",
                "properties": {
                    "player1": {
                        "type": "string",
                        "description": "First player's full name"
                    },
                    "player2": {
                        "type": "string",
                        "description": "Second player's full name"
                    },
                    "format": {
                        "type": "string",
                        "enum": ["test", "odi", "t20", "all"],
                        "description": "Cricket format (default: all)"
                    }
                },
                "required": ["player1", "player2"]
            }),
        ),
    ]
}

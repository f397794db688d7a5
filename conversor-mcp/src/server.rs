//! MCP request handling
//!
//! Lifecycle:
//! - initialize, initialized, ping
//!
//! Tools:
//! - list_categories: Categories with their default units
//! - list_units: Units of a category with factor and increment
//! - convert: Convert a value (defaults to the category's unit pair)
//! - swap: Swap input and output units and convert back
//! - save_snapshot / load_snapshot / clear_snapshot: Last-conversion storage

use conversor_core::{codes, ConvertError, ErrorReport};
use conversor_units::{parse_value, Catalog, Category, Conversion, ConversionRequest, Converter};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use tracing::{debug, info, warn};

use crate::snapshot::{SnapshotError, SnapshotStore};

pub const PROTOCOL_VERSION: &str = "2025-11-25";
pub const SERVER_NAME: &str = "conversor";
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

const PARSE_ERROR: i32 = -32700;
const METHOD_NOT_FOUND: i32 = -32601;
const INVALID_PARAMS: i32 = -32602;

// MCP Protocol types
#[derive(Debug, Deserialize)]
pub struct McpRequest {
    #[allow(dead_code)]
    pub jsonrpc: String,
    pub id: Option<JsonValue>,
    pub method: String,
    #[serde(default)]
    pub params: Option<JsonValue>,
}

#[derive(Debug, Serialize)]
pub struct McpResponse {
    pub jsonrpc: String,
    /// Serialized as `null` when the request id could not be read
    pub id: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<McpError>,
}

#[derive(Debug, Serialize)]
pub struct McpError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<JsonValue>,
}

impl McpError {
    fn invalid_params(message: impl Into<String>) -> Self {
        Self { code: INVALID_PARAMS, message: message.into(), data: None }
    }
}

impl McpResponse {
    fn result(id: Option<JsonValue>, result: JsonValue) -> Self {
        Self { jsonrpc: "2.0".to_string(), id, result: Some(result), error: None }
    }

    fn error(id: Option<JsonValue>, error: McpError) -> Self {
        Self { jsonrpc: "2.0".to_string(), id, result: None, error: Some(error) }
    }

    /// Response to a line that is not valid JSON-RPC
    pub fn parse_error(details: impl std::fmt::Display) -> Self {
        Self::error(None, McpError {
            code: PARSE_ERROR,
            message: format!("Parse error: {}", details),
            data: None,
        })
    }
}

/// Presentation layer over one loaded catalog
pub struct Server {
    catalog: Catalog,
    store: Box<dyn SnapshotStore>,
}

impl Server {
    pub fn new(catalog: Catalog, store: Box<dyn SnapshotStore>) -> Self {
        Self { catalog, store }
    }

    fn converter(&self) -> Converter<'_> {
        Converter::new(&self.catalog)
    }

    pub async fn handle_request(&self, request: &McpRequest) -> McpResponse {
        debug!(method = %request.method, "Processing request");

        let result = match request.method.as_str() {
            // Lifecycle
            "initialize" => self.handle_initialize(&request.params),
            "initialized" | "notifications/initialized" => Ok(json!({})),
            "ping" => Ok(json!({})),

            // Tools
            "tools/list" => Ok(tools_list()),
            "tools/call" => self.handle_tool_call(&request.params).await,

            _ => Err(McpError {
                code: METHOD_NOT_FOUND,
                message: format!("Method not found: {}", request.method),
                data: None,
            }),
        };

        match result {
            Ok(r) => McpResponse::result(request.id.clone(), r),
            Err(e) => {
                warn!(method = %request.method, code = e.code, message = %e.message, "Request failed");
                McpResponse::error(request.id.clone(), e)
            }
        }
    }

    fn handle_initialize(&self, params: &Option<JsonValue>) -> Result<JsonValue, McpError> {
        let client_info = params.as_ref()
            .and_then(|p| p.get("clientInfo"))
            .and_then(|c| c.get("name"))
            .and_then(|n| n.as_str())
            .unwrap_or("unknown");

        // Use client's protocol version for compatibility
        let client_protocol = params.as_ref()
            .and_then(|p| p.get("protocolVersion"))
            .and_then(|v| v.as_str())
            .unwrap_or(PROTOCOL_VERSION);

        info!(client = client_info, protocol = client_protocol, "Client connected");

        Ok(json!({
            "protocolVersion": client_protocol,
            "serverInfo": {
                "name": SERVER_NAME,
                "version": SERVER_VERSION,
                "description": "Unit converter for length, weight, temperature and speed"
            },
            "capabilities": {
                "tools": {
                    "listChanged": false
                }
            },
            "instructions": format!(
                "Conversor converts values between units of one category. Categories: {}. \
                 Use list_units to see the units of a category. Results are rounded to 4 decimal places.",
                self.catalog.list_categories().join(", ")
            )
        }))
    }

    async fn handle_tool_call(&self, params: &Option<JsonValue>) -> Result<JsonValue, McpError> {
        let params = params.as_ref().ok_or_else(|| McpError::invalid_params("Missing params"))?;

        let name = params.get("name")
            .and_then(|v| v.as_str())
            .ok_or_else(|| McpError::invalid_params("Missing tool name"))?;

        let args = params.get("arguments").cloned().unwrap_or(json!({}));

        match name {
            "list_categories" => Ok(self.tool_list_categories()),
            "list_units" => self.tool_list_units(&args),
            "convert" => self.tool_convert(&args),
            "swap" => self.tool_swap(&args),
            "save_snapshot" => self.tool_save_snapshot(&args).await,
            "load_snapshot" => Ok(self.tool_load_snapshot().await),
            "clear_snapshot" => Ok(self.tool_clear_snapshot().await),
            _ => Err(McpError::invalid_params(format!("Unknown tool: {}", name))),
        }
    }

    fn tool_list_categories(&self) -> JsonValue {
        let categories: Vec<JsonValue> = self.catalog.categories().iter()
            .map(category_summary)
            .collect();

        json!({
            "content": [{ "type": "text", "text": self.catalog.list_categories().join("\n") }],
            "categories": categories
        })
    }

    fn tool_list_units(&self, args: &JsonValue) -> Result<JsonValue, McpError> {
        let name = required_str(args, "category")?;
        let category = match self.catalog.category(name) {
            Ok(c) => c,
            Err(e) => return Ok(tool_error(&e)),
        };

        let units: Vec<JsonValue> = category.units().iter()
            .map(|u| json!({ "name": u.name, "factor": u.factor, "increment": u.increment }))
            .collect();
        let text = category.units().iter()
            .map(|u| u.name.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        Ok(json!({
            "content": [{ "type": "text", "text": text }],
            "category": category.name(),
            "affine": category.is_affine(),
            "defaults": category.default_units(),
            "units": units
        }))
    }

    fn tool_convert(&self, args: &JsonValue) -> Result<JsonValue, McpError> {
        let category = required_str(args, "category")?;
        let value = args.get("value")
            .ok_or_else(|| McpError::invalid_params("Missing value argument"))?;

        let defaults = match self.catalog.get_default_units(category) {
            Ok(d) => d,
            Err(e) => return Ok(tool_error(&e)),
        };
        let input_unit = optional_str(args, "input_unit")?.unwrap_or(defaults.input_unit.as_str());
        let output_unit = optional_str(args, "output_unit")?.unwrap_or(defaults.output_unit.as_str());

        let input_value = match json_to_value(value) {
            Ok(v) => v,
            Err(e) => return Ok(tool_error(&e)),
        };

        let request = ConversionRequest {
            category: category.to_string(),
            input_unit: input_unit.to_string(),
            output_unit: output_unit.to_string(),
            input_value,
        };

        Ok(match self.converter().execute(&request) {
            Ok(conversion) => conversion_result(&conversion),
            Err(e) => tool_error(&e),
        })
    }

    fn tool_swap(&self, args: &JsonValue) -> Result<JsonValue, McpError> {
        let current = conversion_from_args(args)?;

        Ok(match self.converter().swap(&current) {
            Ok(conversion) => conversion_result(&conversion),
            Err(e) => tool_error(&e),
        })
    }

    async fn tool_save_snapshot(&self, args: &JsonValue) -> Result<JsonValue, McpError> {
        let snapshot = conversion_from_args(args)?;

        Ok(match self.store.save(&snapshot).await {
            Ok(()) => {
                info!(category = %snapshot.category, "Snapshot saved");
                json!({
                    "content": [{ "type": "text", "text": "Conversion saved" }],
                    "snapshot": snapshot
                })
            }
            Err(e) => storage_error(e),
        })
    }

    async fn tool_load_snapshot(&self) -> JsonValue {
        match self.store.load().await {
            Ok(Some(snapshot)) => {
                let mut result = conversion_result(&snapshot);
                result["snapshot"] = json!(snapshot);
                result
            }
            Ok(None) => json!({
                "content": [{ "type": "text", "text": "No saved conversion" }],
                "snapshot": JsonValue::Null
            }),
            Err(e) => storage_error(e),
        }
    }

    async fn tool_clear_snapshot(&self) -> JsonValue {
        match self.store.clear().await {
            Ok(()) => {
                info!("Snapshot cleared");
                json!({ "content": [{ "type": "text", "text": "Saved conversion cleared" }] })
            }
            Err(e) => storage_error(e),
        }
    }
}

fn tools_list() -> JsonValue {
    let conversion_properties = json!({
        "category": { "type": "string", "description": "Category name, e.g. \"Length\"" },
        "input_unit": { "type": "string", "description": "Unit of input_value" },
        "output_unit": { "type": "string", "description": "Unit of output_value" },
        "input_value": { "type": "number" },
        "output_value": { "type": "number" }
    });

    json!({
        "tools": [
            {
                "name": "list_categories",
                "description": "List the measurement categories with their default units.",
                "inputSchema": { "type": "object", "properties": {} }
            },
            {
                "name": "list_units",
                "description": "List the units of a category with their conversion factor and increment.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "category": { "type": "string", "description": "Category name, e.g. \"Temperature\"" }
                    },
                    "required": ["category"]
                }
            },
            {
                "name": "convert",
                "description": "Convert a value between two units of one category. Units default to the category's default pair. Results are rounded to 4 decimal places, ties away from zero.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "category": { "type": "string", "description": "Category name, e.g. \"Length\"" },
                        "input_unit": { "type": "string", "description": "Source unit, e.g. \"Kilometers\"" },
                        "output_unit": { "type": "string", "description": "Target unit, e.g. \"Miles\"" },
                        "value": {
                            "type": ["number", "string"],
                            "description": "Value to convert; text is parsed as a decimal number"
                        }
                    },
                    "required": ["category", "value"]
                }
            },
            {
                "name": "swap",
                "description": "Swap input and output units, taking the previous output as the new input.",
                "inputSchema": {
                    "type": "object",
                    "properties": conversion_properties.clone(),
                    "required": ["category", "input_unit", "output_unit", "input_value", "output_value"]
                }
            },
            {
                "name": "save_snapshot",
                "description": "Save a conversion so it can be restored later.",
                "inputSchema": {
                    "type": "object",
                    "properties": conversion_properties,
                    "required": ["category", "input_unit", "output_unit", "input_value", "output_value"]
                }
            },
            {
                "name": "load_snapshot",
                "description": "Load the saved conversion, if any.",
                "inputSchema": { "type": "object", "properties": {} }
            },
            {
                "name": "clear_snapshot",
                "description": "Delete the saved conversion.",
                "inputSchema": { "type": "object", "properties": {} }
            }
        ]
    })
}

fn category_summary(category: &Category) -> JsonValue {
    json!({
        "name": category.name(),
        "affine": category.is_affine(),
        "units": category.units().len(),
        "defaults": category.default_units()
    })
}

fn conversion_result(conversion: &Conversion) -> JsonValue {
    json!({
        "content": [{
            "type": "text",
            "text": format!(
                "{} {} = {} {}",
                conversion.input_value, conversion.input_unit,
                conversion.output_value, conversion.output_unit
            )
        }],
        "conversion": conversion
    })
}

/// Conversion failures are tool results, not protocol errors
fn tool_error(err: &ConvertError) -> JsonValue {
    let report = ErrorReport::from(err);
    json!({
        "content": [{ "type": "text", "text": report.to_string() }],
        "error": report,
        "isError": true
    })
}

fn storage_error(err: SnapshotError) -> JsonValue {
    warn!(error = %err, "Snapshot storage failed");
    let report = ErrorReport::new(codes::INTERNAL, format!("Snapshot storage failed: {}", err))
        .with_suggestion("Check that CONVERSOR_SNAPSHOT points to a writable file");
    json!({
        "content": [{ "type": "text", "text": report.to_string() }],
        "error": report,
        "isError": true
    })
}

fn required_str<'a>(args: &'a JsonValue, name: &str) -> Result<&'a str, McpError> {
    optional_str(args, name)?
        .ok_or_else(|| McpError::invalid_params(format!("Missing {} argument", name)))
}

/// `None` only when the argument is absent; any non-string value is rejected
fn optional_str<'a>(args: &'a JsonValue, name: &str) -> Result<Option<&'a str>, McpError> {
    match args.get(name) {
        None => Ok(None),
        Some(JsonValue::String(s)) => Ok(Some(s.as_str())),
        Some(other) => Err(McpError::invalid_params(format!(
            "{} must be a string, got {}", name, other
        ))),
    }
}

fn required_f64(args: &JsonValue, name: &str) -> Result<f64, McpError> {
    args.get(name)
        .and_then(|v| v.as_f64())
        .ok_or_else(|| McpError::invalid_params(format!("Missing numeric {} argument", name)))
}

/// Numbers pass through; text goes through the same check a user's typed
/// input does.
fn json_to_value(json: &JsonValue) -> Result<f64, ConvertError> {
    match json {
        JsonValue::Number(n) => n.as_f64()
            .ok_or_else(|| ConvertError::InvalidValue(format!("{} is not representable", n))),
        JsonValue::String(s) => parse_value(s),
        other => Err(ConvertError::InvalidValue(format!("expected a number, got {}", other))),
    }
}

fn conversion_from_args(args: &JsonValue) -> Result<Conversion, McpError> {
    Ok(Conversion {
        category: required_str(args, "category")?.to_string(),
        input_unit: required_str(args, "input_unit")?.to_string(),
        output_unit: required_str(args, "output_unit")?.to_string(),
        input_value: required_f64(args, "input_value")?,
        output_value: required_f64(args, "output_value")?,
    })
}

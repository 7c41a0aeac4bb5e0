use std::collections::{HashMap, VecDeque};
use std::io::{self, BufRead, Read, Write};
use std::time::Instant;

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use switchboard_assistant::{analysis, match_question, reply, ReplyTable};
use switchboard_core::{
    compute_match_percent, compute_offer_price, compute_savings, format_sort_code,
    is_variable_rank, plan_for, sanitize_account_number, simpler_energy_price, validate_form, CheckoutError, CheckoutFlow,
    ConfidenceFormula, NeedsSession, OfferBoard, OfferFilter, PaymentDetails, PillKey, Scenario,
    SelectionError, UsageLevel,
};
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::protocol::{
    JsonRpcRequest, JsonRpcResponse, INVALID_PARAMS, INVALID_REQUEST, METHOD_NOT_FOUND,
    PARSE_ERROR,
};

const DEFAULT_MCP_PROTOCOL_VERSION: &str = "2024-11-05";
/// Largest `Content-Length` body accepted on stdio.
const MAX_FRAME_BYTES: usize = 1024 * 1024;

/// Per-shopper state: needs pills, scenario skin and checkout progress.
#[derive(Debug, Clone)]
struct ShopperSession {
    needs: NeedsSession,
    scenario: Scenario,
    checkout: CheckoutFlow,
}

#[derive(Debug)]
struct SessionRegistry {
    capacity: usize,
    next_id: u64,
    order: VecDeque<String>,
    entries: HashMap<String, ShopperSession>,
}

impl SessionRegistry {
    fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            next_id: 1,
            order: VecDeque::new(),
            entries: HashMap::new(),
        }
    }

    fn open(&mut self, session: ShopperSession) -> String {
        while self.entries.len() >= self.capacity {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            self.entries.remove(&oldest);
            warn!(session_id = %oldest, "session capacity reached, evicted oldest session");
        }
        let id = format!("sess-{}", self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        self.order.push_back(id.clone());
        self.entries.insert(id.clone(), session);
        id
    }

    fn get(&self, id: &str) -> Option<&ShopperSession> {
        self.entries.get(id)
    }

    fn get_mut(&mut self, id: &str) -> Option<&mut ShopperSession> {
        self.entries.get_mut(id)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

pub struct SwitchboardServer {
    config: ServerConfig,
    sessions: Mutex<SessionRegistry>,
}

impl SwitchboardServer {
    pub fn new(config: ServerConfig) -> Self {
        let sessions = Mutex::new(SessionRegistry::new(config.max_sessions));
        Self { config, sessions }
    }

    pub const fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn session_count(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        if request.jsonrpc != "2.0" {
            return Some(JsonRpcResponse::error(
                request.id.unwrap_or(Value::Null),
                INVALID_REQUEST,
                "invalid jsonrpc version",
            ));
        }

        let is_notification = request.id.is_none();
        let id = request.id.clone().unwrap_or(Value::Null);

        if is_notification && request.method.starts_with("notifications/") {
            return None;
        }

        let response = match request.method.as_str() {
            "initialize" => {
                let protocol_version = request
                    .params
                    .get("protocolVersion")
                    .and_then(Value::as_str)
                    .unwrap_or(DEFAULT_MCP_PROTOCOL_VERSION);
                JsonRpcResponse::success(
                    id,
                    json!({
                        "protocolVersion": protocol_version,
                        "serverInfo": {"name": "switchboard-mcp", "version": env!("CARGO_PKG_VERSION")},
                        "capabilities": {
                            "tools": {
                                "listChanged": false
                            }
                        }
                    }),
                )
            }
            "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => JsonRpcResponse::success(id, tools_list_result()),
            "tools/call" => self.handle_tools_call(id, request.params),
            _ => JsonRpcResponse::error(id, METHOD_NOT_FOUND, "method not found"),
        };

        Some(response)
    }

    fn handle_tools_call(&self, id: Value, params: Value) -> JsonRpcResponse {
        let parsed: ToolsCallParams = match serde_json::from_value(params) {
            Ok(v) => v,
            Err(err) => {
                return JsonRpcResponse::error(id, INVALID_PARAMS, format!("invalid params: {err}"));
            }
        };

        let start = Instant::now();
        let response = match parsed.name.as_str() {
            "session_open" => self.exec_session_open(id, parsed.arguments),
            "needs_select" => self.exec_needs_select(id, parsed.arguments),
            "needs_state" => self.exec_needs_state(id, parsed.arguments),
            "offers_list" => self.exec_offers_list(id, parsed.arguments),
            "offer_explain" => self.exec_offer_explain(id, parsed.arguments),
            "offer_price" => self.exec_offer_price(id, parsed.arguments),
            "match_percent" => exec_match_percent(id, parsed.arguments),
            "savings" => exec_savings(id, parsed.arguments),
            "checkout_validate" => exec_checkout_validate(id, parsed.arguments),
            "checkout_format" => exec_checkout_format(id, parsed.arguments),
            "checkout_update" => self.exec_checkout_update(id, parsed.arguments),
            "checkout_continue" => self.exec_checkout_continue(id, parsed.arguments),
            "checkout_edit" => self.exec_checkout_edit(id, parsed.arguments),
            "checkout_complete" => self.exec_checkout_complete(id, parsed.arguments),
            "assistant_reply" => self.exec_assistant_reply(id, parsed.arguments),
            _ => JsonRpcResponse::error(id, METHOD_NOT_FOUND, "unknown tool"),
        };
        debug!(
            tool = %parsed.name,
            latency_ms = start.elapsed().as_secs_f64() * 1000.0,
            is_error = response.error.is_some(),
            "tool call finished"
        );
        response
    }

    /// Runs `f` against the named session, or answers with `unknown session`.
    fn with_session<F>(&self, id: Value, session_id: &str, f: F) -> JsonRpcResponse
    where
        F: FnOnce(Value, &mut ShopperSession) -> JsonRpcResponse,
    {
        let mut sessions = self.sessions.lock();
        match sessions.get_mut(session_id) {
            Some(session) => f(id, session),
            None => JsonRpcResponse::error(
                id,
                INVALID_PARAMS,
                format!("unknown session: {session_id}"),
            ),
        }
    }

    fn exec_session_open(&self, id: Value, arguments: Option<Value>) -> JsonRpcResponse {
        let args: SessionOpenInput = match parse_args_optional(arguments) {
            Ok(v) => v,
            Err(resp) => return with_id(resp, id),
        };
        let formula = match args.formula.as_deref().map(str::parse::<ConfidenceFormula>) {
            None => self.config.formula,
            Some(Ok(formula)) => formula,
            Some(Err(err)) => return JsonRpcResponse::error(id, INVALID_PARAMS, err.to_string()),
        };
        let scenario = args
            .scenario
            .as_deref()
            .map_or(self.config.default_scenario, Scenario::parse_lenient);

        let needs = NeedsSession::new(formula);
        let confidence = needs.confidence_percent();
        let session_id = self.sessions.lock().open(ShopperSession {
            needs,
            scenario,
            checkout: CheckoutFlow::new(),
        });
        info!(%session_id, %scenario, %formula, "session opened");

        JsonRpcResponse::tool_result(
            id,
            format!("session {session_id} opened"),
            json!({
                "session_id": session_id,
                "scenario": scenario,
                "formula": formula,
                "confidence": confidence
            }),
        )
    }

    fn exec_needs_select(&self, id: Value, arguments: Option<Value>) -> JsonRpcResponse {
        let args: NeedsSelectInput = match parse_args(arguments) {
            Ok(v) => v,
            Err(resp) => return with_id(resp, id),
        };
        self.with_session(id, &args.session_id, |id, session| {
            match session.needs.select_raw(&args.key, &args.value) {
                Ok(outcome) => JsonRpcResponse::tool_result(
                    id,
                    format!(
                        "{} set to {}, confidence {}%",
                        outcome.key, outcome.value, outcome.confidence
                    ),
                    json!({
                        "outcome": outcome,
                        "model": session.needs.model(),
                        "caption": session.needs.caption()
                    }),
                ),
                Err(err) => selection_error(id, &err),
            }
        })
    }

    fn exec_needs_state(&self, id: Value, arguments: Option<Value>) -> JsonRpcResponse {
        let args: SessionRef = match parse_args(arguments) {
            Ok(v) => v,
            Err(resp) => return with_id(resp, id),
        };
        self.with_session(id, &args.session_id, |id, session| {
            let needs = &session.needs;
            let confidence = needs.confidence_percent();
            JsonRpcResponse::tool_result(
                id,
                format!("confidence {confidence}%"),
                needs_state_json(needs, session.scenario),
            )
        })
    }

    fn exec_offers_list(&self, id: Value, arguments: Option<Value>) -> JsonRpcResponse {
        let args: OffersListInput = match parse_args(arguments) {
            Ok(v) => v,
            Err(resp) => return with_id(resp, id),
        };
        let filter = match args.filter.as_deref().map(str::parse::<OfferFilter>) {
            None => OfferFilter::All,
            Some(Ok(filter)) => filter,
            Some(Err(err)) => return JsonRpcResponse::error(id, INVALID_PARAMS, err.to_string()),
        };
        let base_price = self.config.base_price;
        self.with_session(id, &args.session_id, |id, session| {
            let board = OfferBoard::build(&session.needs, base_price, session.scenario);
            let text = if board.visible {
                format!(
                    "{} best offers, {} {filter} offers",
                    board.best.len(),
                    board.filtered(filter).len()
                )
            } else {
                "confirm a pill to see offers".to_string()
            };
            JsonRpcResponse::tool_result(
                id,
                text,
                json!({
                    "visible": board.visible,
                    "confidence": board.confidence,
                    "headline_price": board.headline_price,
                    "filter": filter,
                    "best": board.best,
                    "all": board.filtered(filter)
                }),
            )
        })
    }

    fn exec_offer_explain(&self, id: Value, arguments: Option<Value>) -> JsonRpcResponse {
        let args: OfferExplainInput = match parse_args(arguments) {
            Ok(v) => v,
            Err(resp) => return with_id(resp, id),
        };
        self.with_session(id, &args.session_id, |id, session| {
            let match_percent = session.needs.match_percent(args.rank);
            let savings = compute_savings(match_percent);
            let variable = is_variable_rank(args.rank);
            let usage = session.needs.model().usage_level();
            let explanation = analysis(match_percent, savings, variable, usage);
            JsonRpcResponse::tool_result(
                id,
                explanation.clone(),
                json!({
                    "rank": args.rank,
                    "variable": variable,
                    "plan": plan_for(session.scenario, args.rank, variable),
                    "match_percent": match_percent,
                    "savings": savings,
                    "question": match_question(match_percent, variable),
                    "analysis": explanation
                }),
            )
        })
    }

    fn exec_offer_price(&self, id: Value, arguments: Option<Value>) -> JsonRpcResponse {
        let args: OfferPriceInput = match parse_args_optional(arguments) {
            Ok(v) => v,
            Err(resp) => return with_id(resp, id),
        };
        let mut needs = NeedsSession::new(self.config.formula);
        let selections = [
            (PillKey::SupplyType, args.supply.as_deref()),
            (PillKey::HomeSize, args.home_size.as_deref()),
            (PillKey::Ev, args.ev.as_deref()),
        ];
        for (key, value) in selections {
            if let Some(value) = value {
                if let Err(err) = needs.select_pill(key, value) {
                    return selection_error(id, &err);
                }
            }
        }
        let base_price = args.base_price.unwrap_or(self.config.base_price);
        let price = compute_offer_price(base_price, needs.model());
        let simpler = simpler_energy_price(price);
        JsonRpcResponse::tool_result(
            id,
            format!("\u{a3}{price:.2}/month"),
            json!({
                "base_price": base_price,
                "price": price,
                "simpler_energy_price": simpler,
                "model": needs.model()
            }),
        )
    }

    fn exec_checkout_update(&self, id: Value, arguments: Option<Value>) -> JsonRpcResponse {
        let args: CheckoutUpdateInput = match parse_args(arguments) {
            Ok(v) => v,
            Err(resp) => return with_id(resp, id),
        };
        self.with_session(id, &args.session_id, |id, session| {
            if let Some(enabled) = args.smart_meter {
                if let Err(err) = session.checkout.set_smart_meter(enabled) {
                    return checkout_error(id, &err);
                }
            }
            match session.checkout.update_details(args.details) {
                Ok(validation) => JsonRpcResponse::tool_result(
                    id,
                    format!("form valid: {}", validation.valid),
                    json!({
                        "validation": validation,
                        "details": session.checkout.details(),
                        "can_continue": session.checkout.can_continue(),
                        "total": session.checkout.total()
                    }),
                ),
                Err(err) => checkout_error(id, &err),
            }
        })
    }

    fn exec_checkout_continue(&self, id: Value, arguments: Option<Value>) -> JsonRpcResponse {
        let args: SessionRef = match parse_args(arguments) {
            Ok(v) => v,
            Err(resp) => return with_id(resp, id),
        };
        self.with_session(id, &args.session_id, |id, session| {
            match session.checkout.continue_to_review() {
                Ok(review) => {
                    let review = json!(review);
                    checkout_state(id, "moved to review", &session.checkout, review)
                }
                Err(err) => checkout_error(id, &err),
            }
        })
    }

    fn exec_checkout_edit(&self, id: Value, arguments: Option<Value>) -> JsonRpcResponse {
        let args: SessionRef = match parse_args(arguments) {
            Ok(v) => v,
            Err(resp) => return with_id(resp, id),
        };
        self.with_session(id, &args.session_id, |id, session| {
            match session.checkout.edit() {
                Ok(details) => {
                    let details = json!(details);
                    checkout_state(id, "reopened payment details", &session.checkout, details)
                }
                Err(err) => checkout_error(id, &err),
            }
        })
    }

    fn exec_checkout_complete(&self, id: Value, arguments: Option<Value>) -> JsonRpcResponse {
        let args: SessionRef = match parse_args(arguments) {
            Ok(v) => v,
            Err(resp) => return with_id(resp, id),
        };
        self.with_session(id, &args.session_id, |id, session| {
            match session.checkout.complete() {
                Ok(_) => {
                    info!(session_id = %args.session_id, "checkout submitted");
                    checkout_state(id, "registration complete", &session.checkout, Value::Null)
                }
                Err(err) => checkout_error(id, &err),
            }
        })
    }

    fn exec_assistant_reply(&self, id: Value, arguments: Option<Value>) -> JsonRpcResponse {
        let args: AssistantReplyInput = match parse_args(arguments) {
            Ok(v) => v,
            Err(resp) => return with_id(resp, id),
        };
        let table = match args.table.as_deref().map(str::parse::<ReplyTable>) {
            None => ReplyTable::Marketplace,
            Some(Ok(table)) => table,
            Some(Err(err)) => return JsonRpcResponse::error(id, INVALID_PARAMS, err.to_string()),
        };
        let usage = match args.session_id.as_deref() {
            Some(session_id) => {
                let sessions = self.sessions.lock();
                match sessions.get(session_id) {
                    Some(session) => session.needs.model().usage_level(),
                    None => {
                        return JsonRpcResponse::error(
                            id,
                            INVALID_PARAMS,
                            format!("unknown session: {session_id}"),
                        )
                    }
                }
            }
            None => UsageLevel::Low,
        };
        let answer = reply(table, &args.question, usage);
        JsonRpcResponse::tool_result(
            id,
            answer.clone(),
            json!({
                "table": table,
                "question": args.question,
                "answer": answer
            }),
        )
    }

    /// Serves JSON-RPC over any reader/writer pair, line-delimited or
    /// `Content-Length` framed; replies use the framing of the request.
    pub fn serve<R: BufRead, W: Write>(&self, mut reader: R, mut writer: W) -> io::Result<()> {
        let mut line = String::new();

        loop {
            line.clear();
            if reader.read_line(&mut line)? == 0 {
                break;
            }

            let trimmed = line.trim_end_matches(['\r', '\n']).trim_start();
            if trimmed.is_empty() {
                continue;
            }

            let (payload, frame) = if is_header_line(trimmed) {
                let content_length = match read_content_length(&mut reader, trimmed) {
                    Ok(v) => v,
                    Err(err) => {
                        warn!(error = %err, "invalid stdio frame");
                        let response = JsonRpcResponse::error(
                            Value::Null,
                            PARSE_ERROR,
                            format!("invalid stdio frame: {err}"),
                        );
                        write_response(&mut writer, &response, Frame::LineDelimited)?;
                        continue;
                    }
                };

                if content_length > MAX_FRAME_BYTES {
                    warn!(content_length, "stdio frame exceeds size limit");
                    let limit = u64::try_from(content_length).unwrap_or(u64::MAX);
                    io::copy(&mut reader.by_ref().take(limit), &mut io::sink())?;
                    let response = JsonRpcResponse::error(
                        Value::Null,
                        PARSE_ERROR,
                        format!("stdio frame of {content_length} bytes exceeds {MAX_FRAME_BYTES}"),
                    );
                    write_response(&mut writer, &response, Frame::ContentLength)?;
                    continue;
                }

                let mut body = vec![0_u8; content_length];
                if let Err(err) = reader.read_exact(&mut body) {
                    warn!(error = %err, "truncated stdio frame body");
                    let response = JsonRpcResponse::error(
                        Value::Null,
                        PARSE_ERROR,
                        format!("invalid stdio frame body: {err}"),
                    );
                    write_response(&mut writer, &response, Frame::ContentLength)?;
                    continue;
                }
                (body, Frame::ContentLength)
            } else {
                (trimmed.as_bytes().to_vec(), Frame::LineDelimited)
            };

            let request: JsonRpcRequest = match serde_json::from_slice(&payload) {
                Ok(v) => v,
                Err(err) => {
                    warn!(error = %err, "unparseable request");
                    let response =
                        JsonRpcResponse::error(Value::Null, PARSE_ERROR, format!("parse error: {err}"));
                    write_response(&mut writer, &response, frame)?;
                    continue;
                }
            };

            if let Some(response) = self.handle_request(request) {
                write_response(&mut writer, &response, frame)?;
            }
        }

        Ok(())
    }

    pub fn serve_stdio(&self) -> io::Result<()> {
        let stdin = io::stdin();
        let reader = io::BufReader::new(stdin.lock());
        info!(
            base_price = self.config.base_price,
            formula = %self.config.formula,
            max_sessions = self.config.max_sessions,
            "switchboard-mcp serving on stdio"
        );
        self.serve(reader, io::stdout().lock())
    }
}

impl Default for SwitchboardServer {
    fn default() -> Self {
        Self::new(ServerConfig::default())
    }
}

fn tools_list_result() -> Value {
    let session_only = json!({
        "type": "object",
        "required": ["session_id"],
        "properties": {"session_id": {"type": "string"}}
    });
    let payment_properties = json!({
        "accountHolderName": {"type": "string"},
        "accountNumber": {"type": "string"},
        "sortCode": {"type": "string"},
        "authoriseDebit": {"type": "boolean"},
        "agreeTerms": {"type": "boolean"}
    });
    json!({
        "tools": [
            {
                "name": "session_open",
                "description": "Open a shopper session with all needs pills assumed.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "scenario": {"type": "string", "enum": ["standard", "eon", "bg", "existing", "success", "openrent"]},
                        "formula": {"type": "string", "enum": ["incremental", "linear"]}
                    }
                }
            },
            {
                "name": "needs_select",
                "description": "Select an option for a needs pill and update confidence.",
                "inputSchema": {
                    "type": "object",
                    "required": ["session_id", "key", "value"],
                    "properties": {
                        "session_id": {"type": "string"},
                        "key": {"type": "string", "enum": ["supplyType", "homeSize", "ev", "supply", "bedrooms"]},
                        "value": {"type": "string"}
                    }
                }
            },
            {
                "name": "needs_state",
                "description": "Current pills, confidence, caption and usage level.",
                "inputSchema": session_only
            },
            {
                "name": "offers_list",
                "description": "Ranked offers with match percentages and savings.",
                "inputSchema": {
                    "type": "object",
                    "required": ["session_id"],
                    "properties": {
                        "session_id": {"type": "string"},
                        "filter": {"type": "string", "enum": ["all", "fixed", "variable"]}
                    }
                }
            },
            {
                "name": "offer_explain",
                "description": "Explain the match percentage of the offer at a rank.",
                "inputSchema": {
                    "type": "object",
                    "required": ["session_id", "rank"],
                    "properties": {
                        "session_id": {"type": "string"},
                        "rank": {"type": "integer", "minimum": 0}
                    }
                }
            },
            {
                "name": "offer_price",
                "description": "Monthly price for a home profile.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "base_price": {"type": "number"},
                        "supply": {"type": "string"},
                        "home_size": {"type": "string"},
                        "ev": {"type": "string"}
                    }
                }
            },
            {
                "name": "match_percent",
                "description": "Match percentage for a confidence and offer rank.",
                "inputSchema": {
                    "type": "object",
                    "required": ["confidence", "rank"],
                    "properties": {
                        "confidence": {"type": "integer", "minimum": 0, "maximum": 100},
                        "rank": {"type": "integer", "minimum": 0}
                    }
                }
            },
            {
                "name": "savings",
                "description": "Displayed savings for a match percentage.",
                "inputSchema": {
                    "type": "object",
                    "required": ["match_percent"],
                    "properties": {"match_percent": {"type": "integer", "minimum": 0, "maximum": 100}}
                }
            },
            {
                "name": "checkout_validate",
                "description": "Validate Direct Debit details without touching any session.",
                "inputSchema": {"type": "object", "properties": payment_properties.clone()}
            },
            {
                "name": "checkout_format",
                "description": "Format a sort code and account number as typed.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "sort_code": {"type": "string"},
                        "account_number": {"type": "string"}
                    }
                }
            },
            {
                "name": "checkout_update",
                "description": "Edit step-1 payment details of a session.",
                "inputSchema": {
                    "type": "object",
                    "required": ["session_id"],
                    "properties": {
                        "session_id": {"type": "string"},
                        "smart_meter": {"type": "boolean"},
                        "details": {"type": "object", "properties": payment_properties}
                    }
                }
            },
            {
                "name": "checkout_continue",
                "description": "Advance checkout to the review step when the form is valid.",
                "inputSchema": session_only.clone()
            },
            {
                "name": "checkout_edit",
                "description": "Return from review to the editable payment step.",
                "inputSchema": session_only.clone()
            },
            {
                "name": "checkout_complete",
                "description": "Complete registration from the review step.",
                "inputSchema": session_only
            },
            {
                "name": "assistant_reply",
                "description": "Scripted helper answer for a question.",
                "inputSchema": {
                    "type": "object",
                    "required": ["question"],
                    "properties": {
                        "question": {"type": "string"},
                        "table": {"type": "string", "enum": ["marketplace", "checkout", "plan", "subscriptions"]},
                        "session_id": {"type": "string"}
                    }
                }
            }
        ]
    })
}

fn exec_match_percent(id: Value, arguments: Option<Value>) -> JsonRpcResponse {
    let args: MatchPercentInput = match parse_args(arguments) {
        Ok(v) => v,
        Err(resp) => return with_id(resp, id),
    };
    let match_percent = compute_match_percent(args.confidence, args.rank);
    let savings = compute_savings(match_percent);
    JsonRpcResponse::tool_result(
        id,
        format!("{match_percent}% match, saves you \u{a3}{savings}"),
        json!({
            "confidence": args.confidence,
            "rank": args.rank,
            "match_percent": match_percent,
            "savings": savings
        }),
    )
}

fn exec_savings(id: Value, arguments: Option<Value>) -> JsonRpcResponse {
    let args: SavingsInput = match parse_args(arguments) {
        Ok(v) => v,
        Err(resp) => return with_id(resp, id),
    };
    let savings = compute_savings(args.match_percent);
    JsonRpcResponse::tool_result(
        id,
        format!("saves you \u{a3}{savings}"),
        json!({"match_percent": args.match_percent, "savings": savings}),
    )
}

fn exec_checkout_validate(id: Value, arguments: Option<Value>) -> JsonRpcResponse {
    let details: PaymentDetails = match parse_args_optional(arguments) {
        Ok(v) => v,
        Err(resp) => return with_id(resp, id),
    };
    let validation = validate_form(&details);
    let text = validation
        .first_problem()
        .unwrap_or("payment details complete");
    JsonRpcResponse::tool_result(id, text, json!(validation))
}

fn exec_checkout_format(id: Value, arguments: Option<Value>) -> JsonRpcResponse {
    let args: CheckoutFormatInput = match parse_args_optional(arguments) {
        Ok(v) => v,
        Err(resp) => return with_id(resp, id),
    };
    let sort_code = args.sort_code.as_deref().map(format_sort_code);
    let account_number = args.account_number.as_deref().map(sanitize_account_number);
    JsonRpcResponse::tool_result(
        id,
        "formatted",
        json!({"sort_code": sort_code, "account_number": account_number}),
    )
}

fn needs_state_json(needs: &NeedsSession, scenario: Scenario) -> Value {
    let model = needs.model();
    json!({
        "model": model,
        "confidence": needs.confidence_percent(),
        "formula": needs.formula(),
        "caption": needs.caption(),
        "confirmed_count": model.confirmed_count(),
        "usage": model.usage_level(),
        "celebrated": needs.has_celebrated(),
        "scenario": scenario
    })
}

fn checkout_state(id: Value, text: &str, flow: &CheckoutFlow, detail: Value) -> JsonRpcResponse {
    JsonRpcResponse::tool_result(
        id,
        text,
        json!({
            "step": flow.step(),
            "can_continue": flow.can_continue(),
            "can_complete": flow.can_complete(),
            "review": flow.review(),
            "detail": detail
        }),
    )
}

fn selection_error(id: Value, err: &SelectionError) -> JsonRpcResponse {
    warn!(error = %err, "rejected pill selection");
    JsonRpcResponse::error(id, INVALID_PARAMS, err.to_string())
}

fn checkout_error(id: Value, err: &CheckoutError) -> JsonRpcResponse {
    warn!(error = %err, "rejected checkout action");
    JsonRpcResponse::error(id, INVALID_PARAMS, err.to_string())
}

fn with_id(mut response: JsonRpcResponse, id: Value) -> JsonRpcResponse {
    response.id = id;
    response
}

#[derive(Debug, Clone, Copy)]
enum Frame {
    LineDelimited,
    ContentLength,
}

fn write_response<W: Write>(
    writer: &mut W,
    response: &JsonRpcResponse,
    frame: Frame,
) -> io::Result<()> {
    match frame {
        Frame::LineDelimited => {
            let serialized = serde_json::to_string(response)?;
            writeln!(writer, "{serialized}")?;
        }
        Frame::ContentLength => {
            let serialized = serde_json::to_vec(response)?;
            write!(writer, "Content-Length: {}\r\n\r\n", serialized.len())?;
            writer.write_all(&serialized)?;
        }
    }
    writer.flush()
}

fn is_header_line(line: &str) -> bool {
    let lower = line.to_ascii_lowercase();
    lower.starts_with("content-length:") || lower.starts_with("content-type:")
}

fn read_content_length<R: BufRead>(reader: &mut R, first_line: &str) -> io::Result<usize> {
    let mut content_length = parse_content_length(first_line);
    let mut header_line = String::new();
    loop {
        header_line.clear();
        if reader.read_line(&mut header_line)? == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "unexpected eof while reading frame headers",
            ));
        }
        let trimmed = header_line.trim_end_matches(['\r', '\n']);
        if trimmed.is_empty() {
            break;
        }
        if let Some(v) = parse_content_length(trimmed) {
            content_length = Some(v);
        }
    }
    content_length
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "missing content-length header"))
}

fn parse_content_length(line: &str) -> Option<usize> {
    let (name, value) = line.split_once(':')?;
    if !name.trim().eq_ignore_ascii_case("content-length") {
        return None;
    }
    value.trim().parse::<usize>().ok()
}

fn parse_args<T: DeserializeOwned>(arguments: Option<Value>) -> Result<T, JsonRpcResponse> {
    let Some(args) = arguments else {
        return Err(JsonRpcResponse::error(
            Value::Null,
            INVALID_PARAMS,
            "missing tool arguments",
        ));
    };

    serde_json::from_value(args).map_err(|err| {
        JsonRpcResponse::error(
            Value::Null,
            INVALID_PARAMS,
            format!("invalid tool arguments: {err}"),
        )
    })
}

fn parse_args_optional<T: DeserializeOwned + Default>(
    arguments: Option<Value>,
) -> Result<T, JsonRpcResponse> {
    match arguments {
        Some(v) => serde_json::from_value(v).map_err(|err| {
            JsonRpcResponse::error(
                Value::Null,
                INVALID_PARAMS,
                format!("invalid tool arguments: {err}"),
            )
        }),
        None => Ok(T::default()),
    }
}

#[derive(Debug, Deserialize)]
struct ToolsCallParams {
    name: String,
    arguments: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct SessionRef {
    session_id: String,
}

#[derive(Debug, Deserialize, Default)]
struct SessionOpenInput {
    scenario: Option<String>,
    formula: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NeedsSelectInput {
    session_id: String,
    key: String,
    value: String,
}

#[derive(Debug, Deserialize)]
struct OffersListInput {
    session_id: String,
    filter: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OfferExplainInput {
    session_id: String,
    rank: usize,
}

#[derive(Debug, Deserialize, Default)]
struct OfferPriceInput {
    base_price: Option<f64>,
    #[serde(alias = "supplyType")]
    supply: Option<String>,
    #[serde(alias = "homeSize", alias = "bedrooms")]
    home_size: Option<String>,
    ev: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MatchPercentInput {
    confidence: u8,
    rank: usize,
}

#[derive(Debug, Deserialize)]
struct SavingsInput {
    match_percent: u8,
}

#[derive(Debug, Deserialize, Default)]
struct CheckoutFormatInput {
    sort_code: Option<String>,
    account_number: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CheckoutUpdateInput {
    session_id: String,
    smart_meter: Option<bool>,
    #[serde(default)]
    details: PaymentDetails,
}

#[derive(Debug, Deserialize)]
struct AssistantReplyInput {
    question: String,
    table: Option<String>,
    session_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shopper() -> ShopperSession {
        ShopperSession {
            needs: NeedsSession::default(),
            scenario: Scenario::Standard,
            checkout: CheckoutFlow::new(),
        }
    }

    #[test]
    fn registry_evicts_oldest_when_full() {
        let mut registry = SessionRegistry::new(2);
        let first = registry.open(shopper());
        let second = registry.open(shopper());
        let third = registry.open(shopper());
        assert_eq!(registry.len(), 2);
        assert!(registry.get_mut(&first).is_none());
        assert!(registry.get_mut(&second).is_some());
        assert!(registry.get_mut(&third).is_some());
    }

    #[test]
    fn content_length_header_parses_case_insensitively() {
        assert_eq!(parse_content_length("content-LENGTH: 42"), Some(42));
        assert_eq!(parse_content_length("Content-Type: application/json"), None);
        assert!(is_header_line("Content-Length: 1"));
        assert!(!is_header_line("{\"jsonrpc\":\"2.0\"}"));
    }

    #[test]
    fn oversized_frame_is_drained_without_running_its_body() {
        let next = r#"{"jsonrpc":"2.0","id":2,"method":"ping"}"#;
        let input = format!("Content-Length: 99999999999\r\n\r\n{{\"id\":1}}\n{next}\n");
        let mut output = Vec::new();
        SwitchboardServer::default()
            .serve(io::Cursor::new(input.into_bytes()), &mut output)
            .expect("serve");

        let text = String::from_utf8(output).expect("utf8 output");
        let (header, body) = text.split_once("\r\n\r\n").expect("framed error");
        assert!(header.starts_with("Content-Length:"));
        let error: Value = serde_json::from_str(body.trim()).expect("error json");
        assert_eq!(error["error"]["code"], json!(PARSE_ERROR));
        assert!(!text.contains("\"id\":2"));
    }

    #[test]
    fn missing_headers_terminator_is_eof() {
        let mut reader = io::Cursor::new(b"Content-Type: x\r\n".to_vec());
        let err = read_content_length(&mut reader, "Content-Length: 5").expect_err("eof");
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }
}

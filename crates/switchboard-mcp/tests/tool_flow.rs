use serde_json::{json, Value};
use switchboard_mcp::protocol::{JsonRpcRequest, INVALID_PARAMS, METHOD_NOT_FOUND};
use switchboard_mcp::{ServerConfig, SwitchboardServer};

fn call(server: &SwitchboardServer, id: u64, name: &str, arguments: Value) -> Value {
    let response = server
        .handle_request(JsonRpcRequest::tool_call(id, name, arguments))
        .expect("tool call response");
    serde_json::to_value(&response).expect("serialize response")
}

fn structured(response: &Value) -> &Value {
    &response["result"]["structuredContent"]
}

fn open_session(server: &SwitchboardServer, arguments: Value) -> String {
    let response = call(server, 1, "session_open", arguments);
    structured(&response)["session_id"]
        .as_str()
        .expect("session id")
        .to_string()
}

fn select(server: &SwitchboardServer, session_id: &str, key: &str, value: &str) -> Value {
    let response = call(
        server,
        2,
        "needs_select",
        json!({"session_id": session_id, "key": key, "value": value}),
    );
    assert!(response.get("error").is_none(), "{response}");
    structured(&response).clone()
}

#[test]
fn tools_list_names_every_tool() {
    let server = SwitchboardServer::default();
    let response = server
        .handle_request(JsonRpcRequest {
            jsonrpc: "2.0".to_string(),
            id: Some(json!(1)),
            method: "tools/list".to_string(),
            params: Value::Null,
        })
        .expect("tools/list response");
    let result = response.result.expect("result");
    let names = result["tools"]
        .as_array()
        .expect("tools array")
        .iter()
        .filter_map(|tool| tool["name"].as_str())
        .collect::<Vec<_>>();
    for expected in [
        "session_open",
        "needs_select",
        "needs_state",
        "offers_list",
        "offer_explain",
        "offer_price",
        "match_percent",
        "savings",
        "checkout_validate",
        "checkout_format",
        "checkout_update",
        "checkout_continue",
        "checkout_edit",
        "checkout_complete",
        "assistant_reply",
    ] {
        assert!(names.contains(&expected), "missing {expected}");
    }
}

#[test]
fn notifications_get_no_response() {
    let server = SwitchboardServer::default();
    let response = server.handle_request(JsonRpcRequest {
        jsonrpc: "2.0".to_string(),
        id: None,
        method: "notifications/initialized".to_string(),
        params: Value::Null,
    });
    assert!(response.is_none());
}

#[test]
fn confirming_every_pill_celebrates_once() {
    let server = SwitchboardServer::default();
    let session_id = open_session(&server, json!({}));

    let hidden = call(&server, 3, "offers_list", json!({"session_id": session_id}));
    assert_eq!(structured(&hidden)["visible"], json!(false));

    let first = select(&server, &session_id, "supplyType", "dual");
    assert_eq!(first["outcome"]["confidence"], json!(75));
    assert_eq!(first["outcome"]["first_confirmation"], json!(true));
    assert_eq!(first["outcome"]["celebrate"], json!(false));

    let second = select(&server, &session_id, "bedrooms", "3-4");
    assert_eq!(second["outcome"]["confidence"], json!(85));

    let third = select(&server, &session_id, "ev", "Electric vehicle: Yes");
    assert_eq!(third["outcome"]["confidence"], json!(100));
    assert_eq!(third["outcome"]["celebrate"], json!(true));
    assert_eq!(
        third["caption"],
        json!("Nice work \u{2014} you\u{2019}ve reached 100% confidence")
    );

    let again = select(&server, &session_id, "ev", "no");
    assert_eq!(again["outcome"]["confidence"], json!(100));
    assert_eq!(again["outcome"]["pulse"], json!(true));
    assert_eq!(again["outcome"]["celebrate"], json!(false));

    let state = call(&server, 4, "needs_state", json!({"session_id": session_id}));
    let state = structured(&state);
    assert_eq!(state["confirmed_count"], json!(3));
    assert_eq!(state["celebrated"], json!(true));
    assert_eq!(state["usage"], json!("medium"));
}

#[test]
fn offers_follow_confidence_and_filter() {
    let server = SwitchboardServer::default();
    let session_id = open_session(&server, json!({"scenario": "eon"}));
    select(&server, &session_id, "supply", "Electricity only");

    let response = call(
        &server,
        5,
        "offers_list",
        json!({"session_id": session_id, "filter": "variable"}),
    );
    let board = structured(&response);
    assert_eq!(board["visible"], json!(true));
    assert_eq!(board["confidence"], json!(75));
    assert_eq!(board["best"][0]["match_percent"], json!(75));
    assert_eq!(board["best"][0]["savings"], json!(20));
    assert_eq!(board["best"][0]["plan"]["provider"], json!("e.on"));

    let variable = board["all"].as_array().expect("filtered offers");
    assert_eq!(variable.len(), 3);
    assert!(variable
        .iter()
        .all(|offer| offer["plan"]["product"] == json!("Agile Octopus")));
}

#[test]
fn offer_explain_uses_session_usage() {
    let server = SwitchboardServer::default();
    let session_id = open_session(&server, json!({}));
    select(&server, &session_id, "homeSize", "3-4");

    let response = call(
        &server,
        6,
        "offer_explain",
        json!({"session_id": session_id, "rank": 2}),
    );
    let explained = structured(&response);
    assert_eq!(explained["variable"], json!(true));
    assert_eq!(explained["plan"]["product"], json!("Agile Octopus"));
    assert_eq!(explained["match_percent"], json!(65));
    assert_eq!(explained["savings"], json!(28));
    assert_eq!(
        explained["question"],
        json!("Why is this variable plan a 65% match for me?")
    );
    let analysis = explained["analysis"].as_str().expect("analysis text");
    assert!(analysis.contains("good match at 65% for your medium usage"));
}

#[test]
fn offer_price_applies_every_multiplier() {
    let server = SwitchboardServer::default();
    let response = call(
        &server,
        7,
        "offer_price",
        json!({"supply": "dual", "home_size": "5+", "ev": "yes"}),
    );
    let price = structured(&response)["price"].as_f64().expect("price");
    assert!((price - 62.69).abs() < 1e-9, "price was {price}");

    let response = call(&server, 8, "offer_price", json!({"base_price": 100.0}));
    let price = structured(&response)["price"].as_f64().expect("price");
    assert!((price - 100.0).abs() < 1e-9);
}

#[test]
fn stateless_calculators_answer() {
    let server = SwitchboardServer::default();
    let response = call(&server, 9, "match_percent", json!({"confidence": 67, "rank": 4}));
    assert_eq!(structured(&response)["match_percent"], json!(50));
    assert_eq!(structured(&response)["savings"], json!(40));

    let response = call(&server, 10, "savings", json!({"match_percent": 100}));
    assert_eq!(structured(&response)["savings"], json!(10));

    let response = call(
        &server,
        11,
        "checkout_format",
        json!({"sort_code": "12a3456789", "account_number": "12-34-56-78-90"}),
    );
    assert_eq!(structured(&response)["sort_code"], json!("12-34-56"));
    assert_eq!(structured(&response)["account_number"], json!("12345678"));

    let response = call(
        &server,
        12,
        "checkout_validate",
        json!({"accountHolderName": "A", "accountNumber": "1234", "sortCode": ""}),
    );
    let validation = structured(&response);
    assert_eq!(validation["valid"], json!(false));
    assert_eq!(
        validation["accountHolderName"]["error"],
        json!("Please enter a valid name")
    );
    assert_eq!(
        validation["accountNumber"]["error"],
        json!("Account number must be 8 digits")
    );
    assert_eq!(
        validation["sortCode"]["error"],
        json!("Sort code is required")
    );
}

#[test]
fn checkout_walks_through_both_steps() {
    let server = SwitchboardServer::default();
    let session_id = open_session(&server, json!({}));

    let early = call(&server, 13, "checkout_continue", json!({"session_id": session_id}));
    assert_eq!(early["error"]["code"], json!(INVALID_PARAMS));

    let updated = call(
        &server,
        14,
        "checkout_update",
        json!({
            "session_id": session_id,
            "smart_meter": true,
            "details": {
                "accountHolderName": "Sam Taylor",
                "accountNumber": "1234 5678",
                "sortCode": "123456",
                "authoriseDebit": true,
                "agreeTerms": true
            }
        }),
    );
    let updated = structured(&updated);
    assert_eq!(updated["can_continue"], json!(true));
    assert_eq!(updated["details"]["sortCode"], json!("12-34-56"));
    let total = updated["total"].as_f64().expect("total");
    assert!((total - 82.71).abs() < 1e-9);

    let review = call(&server, 15, "checkout_continue", json!({"session_id": session_id}));
    let review = structured(&review);
    assert_eq!(review["step"], json!("step2Active"));
    assert_eq!(review["detail"]["accountNumber"], json!("12345678"));

    let edit = call(&server, 16, "checkout_edit", json!({"session_id": session_id}));
    assert_eq!(structured(&edit)["step"], json!("step1Active"));
    assert_eq!(structured(&edit)["detail"]["accountHolderName"], json!("Sam Taylor"));

    call(&server, 17, "checkout_continue", json!({"session_id": session_id}));
    let done = call(&server, 18, "checkout_complete", json!({"session_id": session_id}));
    assert_eq!(structured(&done)["step"], json!("submitted"));

    let late = call(&server, 19, "checkout_edit", json!({"session_id": session_id}));
    assert_eq!(late["error"]["code"], json!(INVALID_PARAMS));
}

#[test]
fn assistant_reply_picks_table() {
    let server = SwitchboardServer::default();
    let response = call(
        &server,
        20,
        "assistant_reply",
        json!({"question": "Is direct debit secure?", "table": "checkout"}),
    );
    let answer = structured(&response)["answer"].as_str().expect("answer");
    assert!(answer.starts_with("Direct Debit is very secure"));

    let response = call(
        &server,
        21,
        "assistant_reply",
        json!({"question": "hi", "table": "lounge"}),
    );
    assert_eq!(response["error"]["code"], json!(INVALID_PARAMS));

    let response = call(
        &server,
        22,
        "assistant_reply",
        json!({"question": "I'd like to change my plan", "table": "subscriptions"}),
    );
    let answer = structured(&response)["answer"].as_str().expect("answer");
    assert!(answer.starts_with("You're currently on the EON Next Gust 12m plan"));
}

#[test]
fn offer_explain_reads_fixed_ranks_as_fixed() {
    let server = SwitchboardServer::default();
    let session_id = open_session(&server, json!({}));
    select(&server, &session_id, "ev", "yes");

    for (rank, variable) in [(0, false), (1, false), (3, false), (5, true)] {
        let response = call(
            &server,
            23,
            "offer_explain",
            json!({"session_id": session_id, "rank": rank}),
        );
        let explained = structured(&response);
        assert_eq!(explained["variable"], json!(variable), "rank {rank}");
        let kind = if variable { "variable" } else { "fixed" };
        let question = explained["question"].as_str().expect("question");
        assert!(question.contains(kind), "rank {rank}: {question}");
    }
}

#[test]
fn bad_inputs_are_invalid_params() {
    let server = SwitchboardServer::default();
    let session_id = open_session(&server, json!({}));

    let response = call(
        &server,
        22,
        "needs_select",
        json!({"session_id": session_id, "key": "ev", "value": "maybe"}),
    );
    assert_eq!(response["error"]["code"], json!(INVALID_PARAMS));

    let response = call(
        &server,
        23,
        "needs_select",
        json!({"session_id": session_id, "key": "tariff", "value": "no"}),
    );
    assert_eq!(response["error"]["code"], json!(INVALID_PARAMS));

    let response = call(&server, 24, "needs_state", json!({"session_id": "sess-999"}));
    assert_eq!(response["error"]["code"], json!(INVALID_PARAMS));

    let response = call(&server, 25, "needs_state", Value::Null);
    assert_eq!(response["error"]["code"], json!(INVALID_PARAMS));
    assert_eq!(response["id"], json!(25));

    let response = call(&server, 26, "memory_store", json!({}));
    assert_eq!(response["error"]["code"], json!(METHOD_NOT_FOUND));
}

#[test]
fn linear_sessions_and_capacity_follow_config() {
    let server = SwitchboardServer::new(ServerConfig {
        max_sessions: 1,
        ..ServerConfig::default()
    });
    let first = open_session(&server, json!({"formula": "linear"}));
    let outcome = select(&server, &first, "homeSize", "1-2");
    assert_eq!(outcome["outcome"]["confidence"], json!(67));

    let second = open_session(&server, json!({}));
    assert_eq!(server.session_count(), 1);
    assert_ne!(first, second);
    let evicted = call(&server, 27, "needs_state", json!({"session_id": first}));
    assert_eq!(evicted["error"]["code"], json!(INVALID_PARAMS));
}

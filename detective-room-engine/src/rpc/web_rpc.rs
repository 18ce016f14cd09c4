use crate::engine::loading::texture_cache::LoadingStats;
use crate::engine::loading::texture_loader::TextureLoadingStatus;
use crate::engine::systems::perf::PerfSnapshot;
use crate::engine::systems::quality::{QualitySettings, RenderQuality, TuneCommand, TuneQueue};
use crate::tools::inspect::InspectChanged;
use crate::tools::puzzle::{GameError, GameState, PuzzleSolved};
use bevy::prelude::*;
use serde::{Deserialize, Serialize};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::JsValue;

#[cfg(target_arch = "wasm32")]
use web_sys::{MessageEvent, window};

/// JSON-RPC 2.0 request structure.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RpcRequest {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
    #[serde(default)]
    pub id: Option<serde_json::Value>,
}

/// JSON-RPC 2.0 response structure.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RpcResponse {
    pub jsonrpc: String,
    pub result: Option<serde_json::Value>,
    pub error: Option<RpcError>,
    pub id: Option<serde_json::Value>,
}

/// JSON-RPC 2.0 notification structure for one-way communication.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RpcNotification {
    pub jsonrpc: String,
    pub method: String,
    pub params: serde_json::Value,
}

/// JSON-RPC 2.0 error object.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
    pub data: Option<serde_json::Value>,
}

/// Resource managing bidirectional RPC communication between the embedding page and Bevy.
/// Handles both request-response patterns and notification broadcasting.
#[derive(Resource, Default)]
pub struct WebRpcInterface {
    outgoing_notifications: Vec<RpcNotification>,
    outgoing_responses: Vec<RpcResponse>,
}

impl WebRpcInterface {
    /// Send notification to the page without expecting response.
    pub fn send_notification(&mut self, method: &str, params: serde_json::Value) {
        self.outgoing_notifications.push(RpcNotification {
            jsonrpc: "2.0".to_string(),
            method: method.to_string(),
            params,
        });
    }

    /// Queue response for transmission to the page.
    fn queue_response(&mut self, response: RpcResponse) {
        self.outgoing_responses.push(response);
    }
}

/// Plugin establishing WebRPC communication layer for iframe-based deployment.
pub struct WebRpcPlugin;

impl Plugin for WebRpcPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<WebRpcInterface>()
            .add_event::<IncomingRpcMessage>()
            .add_systems(
                Update,
                (
                    process_incoming_messages,
                    handle_rpc_messages.run_if(resource_exists::<GameState>),
                    notify_puzzle_solved,
                    notify_inspect_changed,
                    send_outgoing_messages,
                )
                    .chain(),
            );

        #[cfg(target_arch = "wasm32")]
        app.add_systems(Startup, setup_message_listener);
    }
}

#[cfg(target_arch = "wasm32")]
fn setup_message_listener(mut commands: Commands) {
    use std::sync::Arc;
    use std::sync::Mutex;

    // Thread-safe message queue for cross-thread communication.
    let message_queue: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let queue_clone = message_queue.clone();

    let closure = Closure::wrap(Box::new(move |event: MessageEvent| {
        // Filter messages to ensure they contain string data.
        if let Ok(data) = event.data().dyn_into::<js_sys::JsString>() {
            let message_str: String = data.into();

            // Cheap pre-filter before the JSON parse in the schedule.
            if message_str.contains("jsonrpc") {
                if let Ok(mut queue) = queue_clone.lock() {
                    queue.push(message_str);
                }
            }
        }
    }) as Box<dyn FnMut(MessageEvent)>);

    if let Some(window) = window() {
        if let Err(err) =
            window.add_event_listener_with_callback("message", closure.as_ref().unchecked_ref())
        {
            error!("Failed to register message listener: {:?}", err);
        }
    }

    // Prevent closure from being dropped by transferring ownership to JS.
    closure.forget();
    commands.insert_resource(MessageQueue(message_queue));
}

/// Resource wrapping thread-safe message queue for WASM event handling.
#[derive(Resource)]
struct MessageQueue(std::sync::Arc<std::sync::Mutex<Vec<String>>>);

/// Event representing incoming RPC message from the embedding page.
#[derive(Event)]
struct IncomingRpcMessage {
    content: String,
}

fn process_incoming_messages(
    message_queue: Option<Res<MessageQueue>>,
    mut message_events: EventWriter<IncomingRpcMessage>,
) {
    let Some(queue_res) = message_queue else {
        return;
    };

    let messages = if let Ok(mut queue) = queue_res.0.lock() {
        std::mem::take(&mut *queue)
    } else {
        Vec::new()
    };

    for message_str in messages {
        message_events.write(IncomingRpcMessage {
            content: message_str,
        });
    }
}

/// Everything a request handler may read or change.
pub struct RpcContext<'a> {
    pub perf: &'a PerfSnapshot,
    pub textures: LoadingStats,
    pub quality: &'a QualitySettings,
    pub tune: &'a TuneQueue,
    pub game: &'a mut GameState,
    /// Puzzles solved by this batch of requests.
    pub solved: Vec<PuzzleSolved>,
}

#[allow(clippy::too_many_arguments)]
fn handle_rpc_messages(
    mut events: EventReader<IncomingRpcMessage>,
    mut rpc_interface: ResMut<WebRpcInterface>,
    perf: Res<PerfSnapshot>,
    textures: Res<TextureLoadingStatus>,
    quality: Res<QualitySettings>,
    tune: Res<TuneQueue>,
    mut game: ResMut<GameState>,
    mut solved_events: EventWriter<PuzzleSolved>,
) {
    if events.is_empty() {
        return;
    }

    let mut context = RpcContext {
        perf: &perf,
        textures: textures.0,
        quality: &quality,
        tune: &tune,
        game: &mut game,
        solved: Vec::new(),
    };

    for event in events.read() {
        match parse_rpc_message(&event.content) {
            Ok(request) => {
                debug!("Processing RPC method: {}", request.method);
                if let Some(response) = handle_rpc_request(&request, &mut context) {
                    rpc_interface.queue_response(response);
                }
            }
            Err(error_response) => {
                warn!(
                    "Rejected RPC message: {}",
                    error_response
                        .error
                        .as_ref()
                        .map_or("", |error| error.message.as_str())
                );
                rpc_interface.queue_response(error_response);
            }
        }
    }

    solved_events.write_batch(context.solved);
}

/// Parse one incoming message, or build the error response owed to the sender.
pub fn parse_rpc_message(content: &str) -> Result<RpcRequest, RpcResponse> {
    let value = serde_json::from_str::<serde_json::Value>(content).map_err(|err| {
        create_error_response(
            serde_json::Value::Null,
            -32700,
            "Parse error",
            Some(serde_json::json!({ "reason": err.to_string() })),
        )
    })?;

    let id = value.get("id").cloned().unwrap_or(serde_json::Value::Null);
    let request = serde_json::from_value::<RpcRequest>(value).map_err(|err| {
        create_error_response(
            id.clone(),
            -32600,
            "Invalid Request",
            Some(serde_json::json!({ "reason": err.to_string() })),
        )
    })?;

    if request.jsonrpc != "2.0" {
        return Err(create_error_response(
            id,
            -32600,
            "Invalid Request",
            Some(serde_json::json!({ "reason": "jsonrpc must be \"2.0\"" })),
        ));
    }
    Ok(request)
}

/// Handle individual RPC request and generate response based on method.
pub fn handle_rpc_request(request: &RpcRequest, context: &mut RpcContext) -> Option<RpcResponse> {
    let result = match request.method.as_str() {
        "get_perf" => to_json(context.perf),
        "get_texture_loading" => to_json(&context.textures),
        "set_quality" => handle_set_quality(&request.params, context),
        "enable_perf_mode" => {
            context.tune.push(TuneCommand::EnablePerfMode);
            Ok(serde_json::json!({ "success": true }))
        }
        "get_game_state" => handle_get_game_state(context),
        "submit_answer" => handle_submit_answer(&request.params, context),
        "pin_puzzle" => handle_pin_puzzle(&request.params, context),
        _ => {
            warn!("Unknown RPC method: {}", request.method);
            let id = request.id.clone()?;
            return Some(create_error_response(
                id,
                -32601,
                "Method not found",
                Some(serde_json::json!({"method": request.method})),
            ));
        }
    };

    // Only generate responses for requests with IDs (notifications have no ID).
    let id = request.id.clone()?;

    match result {
        Ok(result_value) => Some(RpcResponse {
            jsonrpc: "2.0".to_string(),
            result: Some(result_value),
            error: None,
            id: Some(id),
        }),
        Err(error) => Some(RpcResponse {
            jsonrpc: "2.0".to_string(),
            result: None,
            error: Some(error),
            id: Some(id),
        }),
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<serde_json::Value, RpcError> {
    serde_json::to_value(value).map_err(|err| RpcError::internal_error(&err.to_string()))
}

fn handle_set_quality(
    params: &serde_json::Value,
    context: &mut RpcContext,
) -> Result<serde_json::Value, RpcError> {
    let level = params
        .get("level")
        .ok_or_else(|| RpcError::invalid_params("Expected 'level' parameter"))?;
    let quality = RenderQuality::from_json(level)
        .map_err(|err| RpcError::invalid_params(&err.to_string()))?;

    context.tune.push(TuneCommand::SetQuality(quality));
    Ok(serde_json::json!({
        "success": true,
        "quality": quality,
        "previous": context.quality.quality,
    }))
}

fn handle_get_game_state(context: &RpcContext) -> Result<serde_json::Value, RpcError> {
    let puzzles: Vec<_> = context
        .game
        .puzzles()
        .map(|(config, status)| {
            serde_json::json!({
                "id": config.id,
                "title": config.title,
                "status": status,
            })
        })
        .collect();
    let containers: serde_json::Map<_, _> = context
        .game
        .containers()
        .map(|(id, status)| Ok((id.clone(), to_json(status)?)))
        .collect::<Result<_, RpcError>>()?;

    Ok(serde_json::json!({
        "puzzles": puzzles,
        "containers": containers,
    }))
}

#[derive(Deserialize)]
struct PuzzleParams {
    puzzle: String,
    #[serde(default)]
    answer: Option<String>,
}

fn game_error(err: GameError) -> RpcError {
    RpcError::invalid_params(&err.to_string())
}

fn handle_submit_answer(
    params: &serde_json::Value,
    context: &mut RpcContext,
) -> Result<serde_json::Value, RpcError> {
    let parsed = serde_json::from_value::<PuzzleParams>(params.clone())
        .map_err(|_| RpcError::invalid_params("Expected 'puzzle' and 'answer' parameters"))?;
    let answer = parsed
        .answer
        .ok_or_else(|| RpcError::invalid_params("Expected 'answer' parameter"))?;

    let outcome = context
        .game
        .submit_answer(&parsed.puzzle, &answer)
        .map_err(game_error)?;

    if outcome == crate::tools::puzzle::AnswerOutcome::Solved {
        info!("Puzzle {} solved via RPC", parsed.puzzle);
        context.solved.push(PuzzleSolved {
            id: parsed.puzzle.clone(),
            answer: answer.trim().to_string(),
        });
    }

    Ok(serde_json::json!({
        "puzzle": parsed.puzzle,
        "outcome": outcome,
    }))
}

fn handle_pin_puzzle(
    params: &serde_json::Value,
    context: &mut RpcContext,
) -> Result<serde_json::Value, RpcError> {
    let parsed = serde_json::from_value::<PuzzleParams>(params.clone())
        .map_err(|_| RpcError::invalid_params("Expected 'puzzle' parameter"))?;
    let outcome = context.game.pin(&parsed.puzzle).map_err(game_error)?;

    Ok(serde_json::json!({
        "puzzle": parsed.puzzle,
        "outcome": outcome,
    }))
}

/// Create standardized error response with optional data payload.
fn create_error_response(
    id: serde_json::Value,
    code: i32,
    message: &str,
    data: Option<serde_json::Value>,
) -> RpcResponse {
    RpcResponse {
        jsonrpc: "2.0".to_string(),
        result: None,
        error: Some(RpcError {
            code,
            message: message.to_string(),
            data,
        }),
        id: Some(id),
    }
}

fn notify_puzzle_solved(
    mut events: EventReader<PuzzleSolved>,
    mut rpc_interface: ResMut<WebRpcInterface>,
) {
    for event in events.read() {
        rpc_interface.send_notification(
            "puzzle_solved",
            serde_json::json!({
                "puzzle": event.id,
                "answer": event.answer,
            }),
        );
    }
}

fn notify_inspect_changed(
    mut events: EventReader<InspectChanged>,
    mut rpc_interface: ResMut<WebRpcInterface>,
) {
    for event in events.read() {
        match serde_json::to_value(&event.summary) {
            Ok(params) => rpc_interface.send_notification("inspect_changed", params),
            Err(err) => error!("Failed to serialise inspection: {}", err),
        }
    }
}

/// Send queued notifications and responses to the parent page.
fn send_outgoing_messages(mut rpc_interface: ResMut<WebRpcInterface>) {
    // Send notifications first.
    for notification in rpc_interface.outgoing_notifications.drain(..) {
        send_message_to_parent(&notification);
    }

    // Send responses second to maintain order.
    for response in rpc_interface.outgoing_responses.drain(..) {
        send_message_to_parent(&response);
    }
}

/// Send serialized message to parent window.
fn send_message_to_parent<T: Serialize>(message: &T) {
    #[cfg(target_arch = "wasm32")]
    {
        match serde_json::to_string(message) {
            Ok(json) => {
                if let Some(window) = window() {
                    if let Some(parent) = window.parent().ok().flatten() {
                        if let Err(e) = parent.post_message(&JsValue::from_str(&json), "*") {
                            error!("Failed to send message to parent: {:?}", e);
                        }
                    } else {
                        warn!("No parent window available for message transmission");
                    }
                } else {
                    error!("Window object not available");
                }
            }
            Err(e) => {
                error!("Failed to serialize message: {}", e);
            }
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    {
        // No-op for non-WASM targets.
        let _ = message;
    }
}

/// Standard RPC error codes and constructors.
impl RpcError {
    pub fn invalid_params(message: &str) -> Self {
        Self {
            code: -32602,
            message: message.to_string(),
            data: None,
        }
    }

    pub fn internal_error(message: &str) -> Self {
        Self {
            code: -32603,
            message: message.to_string(),
            data: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::assets::room_config::RoomConfig;

    fn game() -> GameState {
        let room = RoomConfig::from_json(
            r#"{
            "camera": { "position": [0, 1.6, 3], "look_at": [0, 1, 0] },
            "props": [
                { "id": "ledger", "shape": { "cuboid": [0.3, 0.03, 0.22] }, "position": [0, 0.8, 0] },
                { "id": "drawer", "shape": { "cuboid": [0.5, 0.15, 0.4] }, "position": [0, 0.6, 0],
                  "interaction": { "container": { "kind": "drawer" } } }
            ],
            "puzzles": [ { "id": "safe", "title": "Safe", "anchors": ["ledger"], "prompt": "Year?",
                           "answers": [{ "text": "1947" }] } ]
        }"#,
        )
        .expect("room parses");
        GameState::from_config(&room).expect("valid")
    }

    fn request(method: &str, params: serde_json::Value) -> RpcRequest {
        RpcRequest {
            jsonrpc: "2.0".into(),
            method: method.into(),
            params,
            id: Some(serde_json::json!(1)),
        }
    }

    struct Fixture {
        perf: PerfSnapshot,
        quality: QualitySettings,
        tune: TuneQueue,
        game: GameState,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                perf: PerfSnapshot {
                    avg_fps: 60.0,
                    ..default()
                },
                quality: QualitySettings::default(),
                tune: TuneQueue::default(),
                game: game(),
            }
        }

        fn call(&mut self, request: &RpcRequest) -> (Option<RpcResponse>, Vec<PuzzleSolved>) {
            let mut context = RpcContext {
                perf: &self.perf,
                textures: LoadingStats {
                    pending: 3,
                    in_flight: 2,
                    queued: 1,
                },
                quality: &self.quality,
                tune: &self.tune,
                game: &mut self.game,
                solved: Vec::new(),
            };
            let response = handle_rpc_request(request, &mut context);
            (response, context.solved)
        }
    }

    fn result(response: Option<RpcResponse>) -> serde_json::Value {
        response.and_then(|r| r.result).expect("successful response")
    }

    fn error_code(response: Option<RpcResponse>) -> i32 {
        response.and_then(|r| r.error).map(|e| e.code).expect("error response")
    }

    #[test]
    fn reports_perf_and_texture_loading() {
        let mut fixture = Fixture::new();
        let (perf, _) = fixture.call(&request("get_perf", serde_json::Value::Null));
        assert_eq!(result(perf)["avgFps"], 60.0);

        let (loading, _) = fixture.call(&request("get_texture_loading", serde_json::Value::Null));
        let loading = result(loading);
        assert_eq!(loading["inFlight"], 2);
        assert_eq!(loading["queued"], 1);
    }

    #[test]
    fn quality_requests_are_queued() {
        let mut fixture = Fixture::new();
        let (response, _) = fixture.call(&request("set_quality", serde_json::json!({ "level": "medium" })));
        assert_eq!(result(response)["quality"], "medium");

        fixture.call(&request("enable_perf_mode", serde_json::Value::Null));
        assert_eq!(
            fixture.tune.drain(),
            vec![
                TuneCommand::SetQuality(RenderQuality::Medium),
                TuneCommand::EnablePerfMode
            ]
        );

        let (bad, _) = fixture.call(&request("set_quality", serde_json::json!({ "level": 9 })));
        assert_eq!(error_code(bad), -32602);
    }

    #[test]
    fn submit_answer_solves_once_and_reports() {
        let mut fixture = Fixture::new();
        let params = serde_json::json!({ "puzzle": "safe", "answer": " 1947 " });

        let (response, solved) = fixture.call(&request("submit_answer", params.clone()));
        assert_eq!(result(response)["outcome"], "solved");
        assert_eq!(solved.len(), 1);
        assert_eq!(solved[0].answer, "1947");

        let (again, solved) = fixture.call(&request("submit_answer", params));
        assert_eq!(result(again)["outcome"], "already_solved");
        assert!(solved.is_empty());
    }

    #[test]
    fn game_state_lists_puzzles_and_containers() {
        let mut fixture = Fixture::new();
        let (pin, _) = fixture.call(&request("pin_puzzle", serde_json::json!({ "puzzle": "safe" })));
        assert_eq!(result(pin)["outcome"], "unavailable");

        let (state, _) = fixture.call(&request("get_game_state", serde_json::Value::Null));
        let state = result(state);
        assert_eq!(state["puzzles"][0]["id"], "safe");
        assert_eq!(state["puzzles"][0]["status"]["solved"], false);
        assert_eq!(state["containers"]["drawer"]["kind"], "drawer");
    }

    #[test]
    fn unknown_method_and_puzzle_are_errors() {
        let mut fixture = Fixture::new();
        let (missing, _) = fixture.call(&request("get_fps", serde_json::Value::Null));
        assert_eq!(error_code(missing), -32601);

        let (unknown, _) = fixture.call(&request(
            "submit_answer",
            serde_json::json!({ "puzzle": "ghost", "answer": "x" }),
        ));
        assert_eq!(error_code(unknown), -32602);
    }

    #[test]
    fn params_may_be_omitted() {
        let request = parse_rpc_message(r#"{ "jsonrpc": "2.0", "method": "get_perf", "id": 4 }"#)
            .expect("valid request");
        assert_eq!(request.params, serde_json::Value::Null);

        let mut fixture = Fixture::new();
        let (response, _) = fixture.call(&request);
        assert_eq!(response.and_then(|r| r.id), Some(serde_json::json!(4)));
    }

    #[test]
    fn malformed_messages_get_error_responses() {
        let garbage = parse_rpc_message("{ jsonrpc").expect_err("not json");
        assert_eq!(garbage.error.map(|e| e.code), Some(-32700));
        assert_eq!(garbage.id, Some(serde_json::Value::Null));

        let no_method = parse_rpc_message(r#"{ "jsonrpc": "2.0", "id": 9 }"#).expect_err("no method");
        assert_eq!(no_method.error.map(|e| e.code), Some(-32600));
        assert_eq!(no_method.id, Some(serde_json::json!(9)));

        let old = parse_rpc_message(r#"{ "jsonrpc": "1.0", "method": "get_perf", "id": 1 }"#)
            .expect_err("wrong version");
        assert_eq!(old.error.map(|e| e.code), Some(-32600));
    }

    #[test]
    fn notifications_get_no_response() {
        let mut fixture = Fixture::new();
        let mut notification = request("enable_perf_mode", serde_json::Value::Null);
        notification.id = None;
        let (response, _) = fixture.call(&notification);
        assert!(response.is_none());
        assert_eq!(fixture.tune.drain(), vec![TuneCommand::EnablePerfMode]);
    }
}

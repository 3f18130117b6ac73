use utoipa::OpenApi;

#[allow(dead_code)]
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Dripline Concierge",
        description = "Chat assistant endpoint for Dripline Hydration & Wellness"
    ),
    paths(
        crate::router::healthz,
        crate::chat::chat_send,
        crate::chat::chat_history,
        crate::chat::chat_clear,
    ),
    components(schemas(
        dripline_protocol::ChatRequest,
        dripline_protocol::ChatReply,
        dripline_protocol::ChatMessage,
        dripline_protocol::Role,
    )),
    tags(
        (name = "Chat", description = "Conversational assistant"),
        (name = "Meta", description = "Service plumbing")
    )
)]
pub struct ApiDoc;

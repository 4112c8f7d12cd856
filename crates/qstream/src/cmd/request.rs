use qstream_event::{ConversationState, GenerateAssistantResponseRequest};

use crate::cmd::RequestArgs;
use crate::exit::{CliError, CliResult, INTERNAL, SUCCESS, USAGE};

pub fn run(args: RequestArgs) -> CliResult<i32> {
    let body = build(&args)?;
    let json = if args.pretty {
        serde_json::to_string_pretty(&body)
    } else {
        body.to_json()
    }
    .map_err(|err| CliError::new(INTERNAL, format!("failed serializing request: {err}")))?;

    println!("{json}");
    Ok(SUCCESS)
}

fn build(args: &RequestArgs) -> CliResult<GenerateAssistantResponseRequest> {
    if args.content.trim().is_empty() {
        return Err(CliError::new(USAGE, "--content must not be empty"));
    }

    let mut state = ConversationState::manual(args.content.as_str());
    if let Some(id) = &args.conversation_id {
        state = state.with_conversation_id(id.as_str());
    }
    Ok(GenerateAssistantResponseRequest::new(state))
}

//! Demo skill served by the binary: a welcome, a re-prompting fallback, a
//! yes/no entity, and a facts game built from nested intents.

use parlance_core::{EntityOptions, IntentConfig, RegistrationError, TermEntry};
use parlance_dialog::{
    ActionGroup, Assistant, Completion, Context, Conversation, HandlerError, IntentHandler,
    Phrase, PhraseOptions, SpeechOutput,
};
use rand::seq::SliceRandom;
use serde_json::{json, Map, Value};

/// Fallback prompts in a row before offering to continue.
const MAX_REPROMPT: u64 = 2;

const WELCOME: [&str; 3] = ["Hello!", "Welcome!", "Hi!"];

const FACTS: [&str; 4] = [
    "Super interesting fact 1.",
    "Super interesting fact 2.",
    "Super interesting fact 3.",
    "Super interesting fact 4.",
];

const FALLBACK_INTENTS: [&str; 2] = ["input.unknown", "input.unknown.response"];

pub fn register(assistant: &mut Assistant) -> Result<(), RegistrationError> {
    register_entities(assistant)?;
    register_welcome(assistant)?;
    register_fallback(assistant)?;
    register_facts(assistant)?;
    Ok(())
}

fn register_entities(assistant: &mut Assistant) -> Result<(), RegistrationError> {
    assistant.entity(
        "response",
        vec![
            TermEntry::new(
                "yes",
                vec![
                    "yes", "yep", "ok", "sure", "next", "yup", "got it", "sure do", "yip",
                    "uh huh", "yeah", "check", "affirmative", "okay", "go on",
                ],
            ),
            TermEntry::new(
                "no",
                vec![
                    "no", "nope", "nah", "not really", "nothing", "I don't", "I do not",
                    "no thanks",
                ],
            ),
        ],
        EntityOptions::default(),
    )?;
    Ok(())
}

fn register_welcome(assistant: &mut Assistant) -> Result<(), RegistrationError> {
    assistant.intent_fn(
        "input.welcome",
        Some(IntentConfig::new().user_says(["Hi", "Hey", "Hello", "What's up"])),
        |_, speech| {
            speech
                .say_random(WELCOME, PhraseOptions::new().no_repeat())
                .say("Lets test the fallback intent!")
                .say_with("I won't repeat this.", PhraseOptions::new().no_repeat())
                .say_with("I will only say this on fallback.", PhraseOptions::new().fallback())
                .say_with(
                    "Test this fallback by saying anything. For example, say \"Fallback\".",
                    PhraseOptions::new().no_repeat(),
                )
                .say_with("Say something else again.", PhraseOptions::new().fallback());
            Ok(Completion::ask())
        },
    )?;
    Ok(())
}

fn with_field(state: &Value, key: &str, value: Value) -> Option<Value> {
    let mut next = state.as_object()?.clone();
    next.insert(key.to_string(), value);
    Some(Value::Object(next))
}

fn fallback_group() -> ActionGroup {
    ActionGroup::new(
        "fallback",
        json!({"invoked": false, "count": 0, "contexts": [], "lastOutput": []}),
    )
    .on("APP_START_RESPONSE", |state: &Value, _: &Value| {
        with_field(state, "invoked", json!(false))
    })
    .on("APP_OUTPUT", |state: &Value, payload: &Value| {
        let mut next = state.as_object()?.clone();
        let key = payload["key"].as_str().unwrap_or_default();
        if !FALLBACK_INTENTS.contains(&key) {
            next.insert("lastOutput".into(), payload["output"].clone());
        }
        let invoked = state["invoked"].as_bool().unwrap_or(false);
        let count = if invoked {
            state["count"].as_u64().unwrap_or(0) + 1
        } else {
            0
        };
        next.insert("count".into(), json!(count));
        Some(Value::Object(next))
    })
    .on("FALLBACK_INVOKED", |state: &Value, _: &Value| {
        with_field(state, "invoked", json!(true))
    })
    .on("SET_FALLBACK_CONTEXTS", |state: &Value, payload: &Value| {
        with_field(state, "contexts", payload.clone())
    })
}

/// Adds the previous output back: repeatable phrases when there are any,
/// else everything.
fn repeat_last_output(speech: &mut SpeechOutput, last: &Value) -> Result<(), HandlerError> {
    match last {
        Value::Array(items) if !items.is_empty() => {
            let phrases: Vec<Phrase> = serde_json::from_value(last.clone())?;
            let repeatable = SpeechOutput::filter_repeatable(&phrases);
            if repeatable.is_empty() {
                speech.extend(&phrases, PhraseOptions::default());
            } else {
                speech.extend(&repeatable, PhraseOptions::default());
            }
        }
        Value::String(text) if !text.is_empty() => {
            speech.say(text.clone());
        }
        _ => {}
    }
    Ok(())
}

fn register_fallback(assistant: &mut Assistant) -> Result<(), RegistrationError> {
    assistant.action(fallback_group())?;

    assistant.intent_fn(
        "input.unknown",
        Some(IntentConfig::new().fallback()),
        |conv, speech| {
            let count = conv
                .state("fallback")
                .and_then(|s| s["count"].as_u64())
                .unwrap_or(0);
            conv.dispatch("FALLBACK_INVOKED", &Value::Null);

            if count >= MAX_REPROMPT {
                speech
                    .set("I'm having trouble understanding.")
                    .say("Would you like to continue?");
                if conv.context("fallback_response_context").is_none() {
                    let contexts = serde_json::to_value(conv.contexts())?;
                    conv.dispatch("SET_FALLBACK_CONTEXTS", &contexts);
                }
                conv.set_context("fallback_response_context", 1, Map::new());
                return Ok(Completion::ask());
            }

            speech.set(format!("Sorry. I didn't catch that ({}).", count + 1));
            conv.restore_contexts(None);
            let last = conv
                .state("fallback")
                .map(|s| s["lastOutput"].clone())
                .unwrap_or_default();
            repeat_last_output(speech, &last)?;
            Ok(Completion::ask())
        },
    )?;

    assistant.intent_fn(
        "input.unknown.response",
        Some(
            IntentConfig::new()
                .contexts(["fallback_response_context"])
                .user_says(["@{response:yes}"]),
        ),
        |conv, speech| {
            if conv.argument_string("response") != "yes" {
                speech.set("OK. Bye!");
                return Ok(Completion::tell());
            }

            let state = conv.state("fallback").cloned().unwrap_or_default();
            let contexts: Vec<Context> =
                serde_json::from_value(state["contexts"].clone()).unwrap_or_default();
            conv.restore_contexts(Some(&contexts));

            speech.set("OK!");
            repeat_last_output(speech, &state["lastOutput"])?;
            Ok(Completion::ask())
        },
    )?;
    Ok(())
}

fn facts_group() -> ActionGroup {
    ActionGroup::new("facts", json!({"current": 0, "indexes": []}))
        .on("RANDOMIZE_USER_FACT_INDEXES", |state: &Value, _: &Value| {
            if state["indexes"].as_array().is_some_and(|i| !i.is_empty()) {
                return Some(state.clone());
            }
            let mut indexes: Vec<usize> = (0..FACTS.len()).collect();
            indexes.shuffle(&mut rand::rng());
            Some(json!({"current": 0, "indexes": indexes}))
        })
        .on("NEXT_FACT", |state: &Value, _: &Value| {
            let len = state["indexes"].as_array()?.len() as u64;
            let next = state["current"].as_u64()? + 1;
            with_field(state, "current", json!(if next >= len { 0 } else { next }))
        })
        .on("RESET_FACT", |state: &Value, _: &Value| {
            with_field(state, "current", json!(0))
        })
}

fn fact_position(conv: &Conversation<'_>) -> (usize, Vec<usize>) {
    let state = conv.state("facts").cloned().unwrap_or_default();
    let current = state["current"].as_u64().unwrap_or(0) as usize;
    let indexes = state["indexes"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_u64)
                .map(|i| i as usize)
                .collect()
        })
        .unwrap_or_default();
    (current, indexes)
}

/// Says "OK!", then the current fact via `input.fact.tell`.
struct AskFact;

#[async_trait::async_trait]
impl IntentHandler for AskFact {
    async fn handle(
        &self,
        conv: &mut Conversation<'_>,
        speech: &mut SpeechOutput,
    ) -> Result<Completion, HandlerError> {
        speech.say("OK!");
        conv.dispatch("RANDOMIZE_USER_FACT_INDEXES", &Value::Null);
        if let Some(output) = conv.invoke_intent("input.fact.tell").await {
            append_output(speech, output);
        }
        Ok(Completion::ask())
    }
}

/// Tells the current fact, then asks whether to go on.
struct TellFact;

#[async_trait::async_trait]
impl IntentHandler for TellFact {
    async fn handle(
        &self,
        conv: &mut Conversation<'_>,
        speech: &mut SpeechOutput,
    ) -> Result<Completion, HandlerError> {
        let (current, indexes) = fact_position(conv);
        let fact = indexes
            .get(current)
            .and_then(|i| FACTS.get(*i))
            .ok_or_else(|| HandlerError::failed("fact indexes were not initialised"))?;
        speech.say(*fact);
        if let Some(output) = conv.invoke_intent("input.fact.next").await {
            append_output(speech, output);
        }
        Ok(Completion::ask())
    }
}

/// Answer to "Would you like to hear another fact?".
struct FactResponse;

#[async_trait::async_trait]
impl IntentHandler for FactResponse {
    async fn handle(
        &self,
        conv: &mut Conversation<'_>,
        speech: &mut SpeechOutput,
    ) -> Result<Completion, HandlerError> {
        speech.say("OK!");
        if conv.argument_string("response") == "yes" {
            if let Some(output) = conv.invoke_intent("input.fact.tell").await {
                append_output(speech, output);
            }
            return Ok(Completion::ask());
        }
        speech.say("Is there something else I can help you with?");
        conv.dispatch("RESET_FACT", &Value::Null);
        Ok(Completion::ask())
    }
}

fn append_output(speech: &mut SpeechOutput, output: parlance_dialog::Response) {
    match output {
        parlance_dialog::Response::Speech(nested) => {
            speech.append(&nested);
        }
        other => {
            speech.say(other.render_text());
        }
    }
}

fn register_facts(assistant: &mut Assistant) -> Result<(), RegistrationError> {
    assistant.action(facts_group())?;

    assistant.intent(
        "input.fact",
        Some(IntentConfig::new().user_says([
            "Got any facts?",
            "Tell me a fact",
            "Tell a fact",
            "I want a fact",
            "Tell me an interesting fact",
            "interesting fact",
        ])),
        AskFact,
    )?;

    // Internal intents, only reachable through nested invocation.
    assistant.intent("input.fact.tell", None, TellFact)?;
    assistant.intent_fn("input.fact.next", None, |conv, speech| {
        let (current, indexes) = fact_position(conv);
        speech.pause(0.5);
        if current + 1 < indexes.len() {
            conv.dispatch("NEXT_FACT", &Value::Null);
            speech.say("Would you like to hear another fact?");
            conv.set_context("fact_prompt_next_context", 1, Map::new());
            return Ok(Completion::ask());
        }
        speech
            .say("That's all the facts I have for you.")
            .say("Is there something else I can help you with?");
        conv.dispatch("RESET_FACT", &Value::Null);
        Ok(Completion::ask())
    })?;

    assistant.intent(
        "input.fact.next.response",
        Some(
            IntentConfig::new()
                .contexts(["fact_prompt_next_context"])
                .user_says(["@{response:yes}"]),
        ),
        FactResponse,
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use parlance_dialog::{InvocationState, WebhookRequest};

    fn demo() -> Assistant {
        let mut assistant = Assistant::new("An error occurred.");
        register(&mut assistant).unwrap();
        assistant.mark_started();
        assistant
    }

    fn next_request(action: &str, previous: &parlance_dialog::DialogOutcome, params: Value) -> WebhookRequest {
        let contexts = previous.to_webhook_response().context_out;
        serde_json::from_value(json!({
            "sessionId": "s-1",
            "result": {"action": action, "parameters": params, "contexts": contexts}
        }))
        .unwrap()
    }

    #[test]
    fn test_demo_declares_catalog() {
        let app = demo();
        let names: Vec<_> = app.catalog().intents.names().collect();
        assert_eq!(
            names,
            vec![
                "input.welcome",
                "input.unknown",
                "input.unknown.response",
                "input.fact",
                "input.fact.next.response",
            ]
        );
        assert_eq!(app.catalog().entities.len(), 1);
        assert_eq!(app.dispatcher().fallback(), Some("input.unknown"));
    }

    #[tokio::test]
    async fn test_welcome_then_fallback_repeats_output() {
        let app = demo();
        let welcome = app
            .handle(&WebhookRequest::for_action("input.welcome"))
            .await
            .unwrap();
        assert!(!welcome.reply.speech.contains("only say this on fallback"));
        assert_eq!(welcome.state, InvocationState::Finalized);

        let fallback = app
            .handle(&next_request("input.unknown", &welcome, json!({})))
            .await
            .unwrap();
        let speech = &fallback.reply.speech;
        assert!(speech.starts_with("<speak>Sorry. I didn't catch that (1)."));
        assert!(speech.contains("Lets test the fallback intent!"));
        assert!(speech.contains("I will only say this on fallback."));
        assert!(!speech.contains("I won't repeat this."));
    }

    #[tokio::test]
    async fn test_repeated_fallback_offers_to_continue() {
        let app = demo();
        let mut outcome = app
            .handle(&WebhookRequest::for_action("input.welcome"))
            .await
            .unwrap();
        for _ in 0..2 {
            outcome = app
                .handle(&next_request("some.unknown.action", &outcome, json!({})))
                .await
                .unwrap();
        }
        assert!(outcome.reply.speech.contains("(2)"));

        outcome = app
            .handle(&next_request("input.unknown", &outcome, json!({})))
            .await
            .unwrap();
        assert!(outcome.reply.speech.contains("Would you like to continue?"));
        assert!(outcome
            .contexts_out
            .iter()
            .any(|c| c.name == "fallback_response_context"));

        let bye = app
            .handle(&next_request(
                "input.unknown.response",
                &outcome,
                json!({"response": "no"}),
            ))
            .await
            .unwrap();
        assert_eq!(bye.reply.speech, "<speak>OK. Bye!</speak>");
        assert!(!bye.reply.expect_user_response);
    }

    #[tokio::test]
    async fn test_fact_uses_nested_intents() {
        let app = demo();
        let outcome = app
            .handle(&WebhookRequest::for_action("input.fact"))
            .await
            .unwrap();
        let speech = &outcome.reply.speech;
        assert!(speech.starts_with("<speak>OK! Super interesting fact"));
        assert!(speech.contains("Would you like to hear another fact?"));
        assert!(outcome
            .contexts_out
            .iter()
            .any(|c| c.name == "fact_prompt_next_context"));
        assert_eq!(outcome.session_data["facts"]["current"], 1);
        assert_eq!(outcome.session_data["facts"]["indexes"].as_array().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_all_facts_then_reset() {
        let app = demo();
        let mut outcome = app
            .handle(&WebhookRequest::for_action("input.fact"))
            .await
            .unwrap();
        for _ in 0..3 {
            outcome = app
                .handle(&next_request(
                    "input.fact.next.response",
                    &outcome,
                    json!({"response": "yes"}),
                ))
                .await
                .unwrap();
        }
        assert!(outcome.reply.speech.contains("That's all the facts I have for you."));
        assert_eq!(outcome.session_data["facts"]["current"], 0);
    }
}

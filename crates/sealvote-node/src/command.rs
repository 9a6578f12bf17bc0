//! JSON-lines command protocol.
//!
//! Each input line is one [`Command`]; each output line is one
//! [`Response`]. Identities accept `seal1...` or `0x...` strings, and any
//! other string is treated as a devnet label.

use sealvote_crypto::MockEngine;
use sealvote_ledger::{LedgerError, VotingStore};
use sealvote_types::{Address, ProposalId};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Command {
    Register {
        caller: String,
    },
    RegisterWithWeight {
        caller: String,
        target: String,
        weight: u32,
    },
    UpdateWeight {
        caller: String,
        target: String,
        weight: u32,
    },
    Ban {
        caller: String,
        target: String,
        #[serde(default)]
        reason: String,
    },
    Unban {
        caller: String,
        target: String,
    },
    AddModerator {
        caller: String,
        target: String,
    },
    RemoveModerator {
        caller: String,
        target: String,
    },
    TransferAdmin {
        caller: String,
        target: String,
    },
    Pause {
        caller: String,
    },
    Unpause {
        caller: String,
    },
    CreateProposal {
        creator: String,
        title: String,
        #[serde(default)]
        description: String,
        options: Vec<String>,
        duration: u64,
        min_votes_for_reveal: u32,
    },
    /// Encrypts a unit ballot for `voter` and casts it.
    Vote {
        voter: String,
        proposal_id: ProposalId,
        option_index: u32,
    },
    Reveal {
        caller: String,
        proposal_id: ProposalId,
    },
    Proposal {
        proposal_id: ProposalId,
    },
    Results {
        proposal_id: ProposalId,
    },
    RevealStatus {
        proposal_id: ProposalId,
    },
    Stats {
        proposal_id: ProposalId,
        #[serde(default)]
        viewer: Option<String>,
    },
    Profile {
        identity: String,
    },
    History {
        identity: String,
    },
    Active,
    Ended,
    Summary,
}

/// Outcome of one command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl Response {
    fn success(result: Value) -> Self {
        Self { ok: true, result: Some(result), error: None, kind: None }
    }

    pub fn failure(error: impl Into<String>, kind: Option<String>) -> Self {
        Self { ok: false, result: None, error: Some(error.into()), kind }
    }
}

impl From<Result<Value, LedgerError>> for Response {
    fn from(result: Result<Value, LedgerError>) -> Self {
        match result {
            Ok(value) => Response::success(value),
            Err(e) => Response::failure(e.to_string(), Some(format!("{:?}", e.kind()))),
        }
    }
}

/// Resolve a command identity string.
pub fn identity(s: &str) -> Address {
    s.parse().unwrap_or_else(|_| Address::from_label(s))
}

fn to_value<T: Serialize>(value: T) -> Result<Value, LedgerError> {
    Ok(serde_json::to_value(value).unwrap_or(Value::Null))
}

/// Execute one command against the store.
pub fn execute(store: &VotingStore, engine: &MockEngine, command: Command) -> Response {
    let result = match command {
        Command::Register { caller } => store.register_user(identity(&caller)).map(|_| Value::Null),
        Command::RegisterWithWeight { caller, target, weight } => store
            .register_user_with_weight(identity(&caller), identity(&target), weight)
            .map(|_| Value::Null),
        Command::UpdateWeight { caller, target, weight } => store
            .update_voting_weight(identity(&caller), identity(&target), weight)
            .map(|_| Value::Null),
        Command::Ban { caller, target, reason } => store
            .ban_user(identity(&caller), identity(&target), &reason)
            .map(|_| Value::Null),
        Command::Unban { caller, target } => {
            store.unban_user(identity(&caller), identity(&target)).map(|_| Value::Null)
        }
        Command::AddModerator { caller, target } => {
            store.add_moderator(identity(&caller), identity(&target)).map(|_| Value::Null)
        }
        Command::RemoveModerator { caller, target } => {
            store.remove_moderator(identity(&caller), identity(&target)).map(|_| Value::Null)
        }
        Command::TransferAdmin { caller, target } => {
            store.transfer_admin(identity(&caller), identity(&target)).map(|_| Value::Null)
        }
        Command::Pause { caller } => store.pause(identity(&caller)).map(|_| Value::Null),
        Command::Unpause { caller } => store.unpause(identity(&caller)).map(|_| Value::Null),
        Command::CreateProposal {
            creator,
            title,
            description,
            options,
            duration,
            min_votes_for_reveal,
        } => store
            .create_proposal(identity(&creator), &title, &description, options, duration, min_votes_for_reveal)
            .map(|id| json!({ "proposal_id": id })),
        Command::Vote { voter, proposal_id, option_index } => {
            let voter = identity(&voter);
            let (ballot, proof) = engine.encrypt_input(1, &store.config().contract_address, &voter);
            store
                .cast_vote(voter, proposal_id, option_index, &ballot, &proof)
                .map(|_| Value::Null)
        }
        Command::Reveal { caller, proposal_id } => store
            .reveal_results(identity(&caller), proposal_id)
            .and_then(to_value),
        Command::Proposal { proposal_id } => store.proposal_info(proposal_id).and_then(to_value),
        Command::Results { proposal_id } => store.decrypted_results(proposal_id).and_then(to_value),
        Command::RevealStatus { proposal_id } => store.reveal_status(proposal_id).and_then(to_value),
        Command::Stats { proposal_id, viewer } => {
            let viewer = viewer.as_deref().map(identity);
            store.proposal_stats(proposal_id, viewer.as_ref()).and_then(to_value)
        }
        Command::Profile { identity: who } => {
            let who = identity(&who);
            to_value(json!({
                "identity": who,
                "profile": store.user_profile(&who),
                "can_vote": store.can_user_vote(&who),
                "is_moderator": store.is_moderator(&who),
            }))
        }
        Command::History { identity: who } => to_value(store.voted_proposals(&identity(&who))),
        Command::Active => to_value(store.active_proposals()),
        Command::Ended => to_value(store.ended_proposals()),
        Command::Summary => to_value(store.summary()),
    };
    result.into()
}

/// Parse and execute one input line.
pub fn execute_line(store: &VotingStore, engine: &MockEngine, line: &str) -> Response {
    match serde_json::from_str::<Command>(line) {
        Ok(command) => execute(store, engine, command),
        Err(e) => Response::failure(format!("Invalid command: {}", e), None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sealvote_crypto::QueuedOracle;
    use sealvote_ledger::LedgerConfig;
    use sealvote_types::ManualClock;
    use std::sync::Arc;

    fn setup() -> (VotingStore, Arc<MockEngine>, Arc<ManualClock>) {
        let engine = Arc::new(MockEngine::from_seed("command-test"));
        let oracle = Arc::new(QueuedOracle::new(engine.clone(), "oracle"));
        let clock = Arc::new(ManualClock::new(100));
        let config = LedgerConfig::default().with_genesis_admin(identity("admin"));
        let store = VotingStore::in_memory(config, engine.clone(), oracle, clock.clone()).unwrap();
        (store, engine, clock)
    }

    #[test]
    fn test_identity_resolution() {
        let addr = Address::from_label("alice");
        assert_eq!(identity(&addr.to_string()), addr);
        assert_eq!(identity(&format!("{:x}", addr)), addr);
        assert_eq!(identity("alice"), addr);
    }

    #[test]
    fn test_command_json_shape() {
        let command: Command =
            serde_json::from_str(r#"{"op":"vote","voter":"bob","proposal_id":1,"option_index":0}"#).unwrap();
        assert_eq!(
            command,
            Command::Vote { voter: "bob".to_string(), proposal_id: 1, option_index: 0 }
        );

        let command: Command = serde_json::from_str(r#"{"op":"summary"}"#).unwrap();
        assert_eq!(command, Command::Summary);
    }

    #[test]
    fn test_vote_flow_through_commands() {
        let (store, engine, _clock) = setup();

        let lines = [
            r#"{"op":"register_with_weight","caller":"admin","target":"bob","weight":5}"#,
            r#"{"op":"register","caller":"alice"}"#,
            r#"{"op":"create_proposal","creator":"alice","title":"Lunch","options":["a","b"],"duration":60,"min_votes_for_reveal":1}"#,
            r#"{"op":"vote","voter":"bob","proposal_id":1,"option_index":1}"#,
        ];
        for line in lines {
            let response = execute_line(&store, &engine, line);
            assert!(response.ok, "{} -> {:?}", line, response);
        }

        let response = execute_line(&store, &engine, r#"{"op":"vote","voter":"bob","proposal_id":1,"option_index":0}"#);
        assert!(!response.ok);
        assert_eq!(response.kind.as_deref(), Some("StateConflict"));

        let response = execute_line(&store, &engine, r#"{"op":"active"}"#);
        assert_eq!(response.result, Some(json!([1])));
    }

    #[test]
    fn test_invalid_command_line() {
        let (store, engine, _clock) = setup();
        let response = execute_line(&store, &engine, "{\"op\":\"launch\"}");
        assert!(!response.ok);
        assert!(response.error.unwrap().starts_with("Invalid command"));
    }

    #[test]
    fn test_results_before_reveal() {
        let (store, engine, clock) = setup();
        execute_line(&store, &engine, r#"{"op":"register","caller":"alice"}"#);
        execute_line(
            &store,
            &engine,
            r#"{"op":"create_proposal","creator":"alice","title":"t","options":["a","b"],"duration":10,"min_votes_for_reveal":1}"#,
        );
        let response = execute_line(&store, &engine, r#"{"op":"results","proposal_id":1}"#);
        assert_eq!(response.error.as_deref(), Some("Results not revealed"));

        clock.advance(11);
        let response = execute_line(&store, &engine, r#"{"op":"reveal","caller":"alice","proposal_id":1}"#);
        assert_eq!(response.kind.as_deref(), Some("StateConflict"));
    }
}

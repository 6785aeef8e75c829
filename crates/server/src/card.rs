//! The public agent card.

use crate::config::Config;
use a2a::{AgentCapabilities, AgentCard, AgentSkill};

/// Build the card served from the well-known path, advertising the
/// single genie skill.
pub fn agent_card(config: &Config) -> AgentCard {
    let skill = AgentSkill {
        id: "genie".to_string(),
        name: "Returns genie information".to_string(),
        description: "returns genie information".to_string(),
        tags: vec!["genie".to_string()],
        examples: vec!["List top 3 distribution centers.".to_string()],
    };

    AgentCard {
        name: "genie-agent".to_string(),
        description: "genie agent".to_string(),
        url: format!("{}{}", config.public_url(), config.server.rpc_path),
        version: "1.0.0".to_string(),
        default_input_modes: vec!["text".to_string()],
        default_output_modes: vec!["text".to_string()],
        capabilities: AgentCapabilities {
            streaming: true,
            push_notifications: false,
            state_transition_history: false,
        },
        skills: vec![skill],
        supports_authenticated_extended_card: false,
    }
}

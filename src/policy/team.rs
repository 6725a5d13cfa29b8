//! Team and role directory for reviewer resolution.

use serde::{Deserialize, Serialize};

/// Conventional role granting approval rights
pub const ROLE_APPROVER: &str = "approver";

/// Conventional role granting publish rights
pub const ROLE_PUBLISHER: &str = "publisher";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamMember {
    pub actor_id: String,

    #[serde(default)]
    pub roles: Vec<String>,

    #[serde(default)]
    pub lead: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    pub name: String,

    #[serde(default)]
    pub members: Vec<TeamMember>,
}

/// Directory of teams feeding the `team.*` context paths and the
/// team/role review actions. Unknown teams and roles resolve to empty
/// member lists.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TeamDirectory {
    #[serde(default)]
    pub teams: Vec<Team>,
}

impl TeamDirectory {
    pub fn new(teams: Vec<Team>) -> Self {
        Self { teams }
    }

    /// Names of teams the actor belongs to
    pub fn teams_for(&self, actor_id: &str) -> Vec<String> {
        self.teams
            .iter()
            .filter(|t| t.members.iter().any(|m| m.actor_id == actor_id))
            .map(|t| t.name.clone())
            .collect()
    }

    /// Union of the actor's roles across teams, deduplicated
    pub fn roles_for(&self, actor_id: &str) -> Vec<String> {
        let mut roles: Vec<String> = Vec::new();
        for team in &self.teams {
            for member in team.members.iter().filter(|m| m.actor_id == actor_id) {
                for role in &member.roles {
                    if !roles.contains(role) {
                        roles.push(role.clone());
                    }
                }
            }
        }
        roles
    }

    pub fn is_team_lead(&self, actor_id: &str) -> bool {
        self.teams
            .iter()
            .flat_map(|t| t.members.iter())
            .any(|m| m.actor_id == actor_id && m.lead)
    }

    /// Leads may approve even without the approver role
    pub fn can_approve(&self, actor_id: &str) -> bool {
        self.is_team_lead(actor_id)
            || self
                .roles_for(actor_id)
                .iter()
                .any(|r| r == ROLE_APPROVER)
    }

    pub fn can_publish(&self, actor_id: &str) -> bool {
        self.roles_for(actor_id).iter().any(|r| r == ROLE_PUBLISHER)
    }

    /// Member ids of a team; empty for unknown teams
    pub fn members_of(&self, team: &str) -> Vec<String> {
        self.teams
            .iter()
            .find(|t| t.name == team)
            .map(|t| t.members.iter().map(|m| m.actor_id.clone()).collect())
            .unwrap_or_default()
    }

    /// Member ids holding a role, across all teams
    pub fn members_with_role(&self, role: &str) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for team in &self.teams {
            for member in &team.members {
                if member.roles.iter().any(|r| r == role) && !out.contains(&member.actor_id) {
                    out.push(member.actor_id.clone());
                }
            }
        }
        out
    }

    /// Lead ids of a team; empty for unknown teams
    pub fn leads_of(&self, team: &str) -> Vec<String> {
        self.teams
            .iter()
            .find(|t| t.name == team)
            .map(|t| {
                t.members
                    .iter()
                    .filter(|m| m.lead)
                    .map(|m| m.actor_id.clone())
                    .collect()
            })
            .unwrap_or_default()
    }
}

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Content entities managed from the admin dashboard.
///
/// The serialized form is the REST collection segment (`projects`, `team-members`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityType {
    #[serde(rename = "services")]
    Service,
    #[serde(rename = "projects")]
    Project,
    #[serde(rename = "brands")]
    Brand,
    #[serde(rename = "testimonials")]
    Testimonial,
    #[serde(rename = "team-members")]
    TeamMember,
    #[serde(rename = "site-settings")]
    SiteSettings,
}

impl EntityType {
    pub const ALL: [EntityType; 6] = [
        EntityType::Service,
        EntityType::Project,
        EntityType::Brand,
        EntityType::Testimonial,
        EntityType::TeamMember,
        EntityType::SiteSettings,
    ];

    /// Collection path segment used by the REST API and storage keys.
    pub fn as_path(&self) -> &'static str {
        match self {
            EntityType::Service => "services",
            EntityType::Project => "projects",
            EntityType::Brand => "brands",
            EntityType::Testimonial => "testimonials",
            EntityType::TeamMember => "team-members",
            EntityType::SiteSettings => "site-settings",
        }
    }
}

impl FromStr for EntityType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "service" | "services" => Ok(EntityType::Service),
            "project" | "projects" => Ok(EntityType::Project),
            "brand" | "brands" => Ok(EntityType::Brand),
            "testimonial" | "testimonials" => Ok(EntityType::Testimonial),
            "team-member" | "team-members" => Ok(EntityType::TeamMember),
            "site-settings" | "settings" => Ok(EntityType::SiteSettings),
            _ => Err(anyhow::anyhow!("Invalid entity type: {}", s)),
        }
    }
}

impl Display for EntityType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_singular_plural_and_snake_case() {
        assert_eq!("project".parse::<EntityType>().unwrap(), EntityType::Project);
        assert_eq!("Projects".parse::<EntityType>().unwrap(), EntityType::Project);
        assert_eq!(
            "team_member".parse::<EntityType>().unwrap(),
            EntityType::TeamMember
        );
        assert!("pages".parse::<EntityType>().is_err());
    }

    #[test]
    fn serializes_as_collection_segment() {
        let json = serde_json::to_string(&EntityType::TeamMember).unwrap();
        assert_eq!(json, "\"team-members\"");
        for entity_type in EntityType::ALL {
            assert_eq!(entity_type.to_string(), entity_type.as_path());
        }
    }
}

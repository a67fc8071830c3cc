//! Bound service instances and tag matching

use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;

/// Service label under which the platform lists user-provided services
pub const USER_PROVIDED_LABEL: &str = "user-provided";

/// Raw service entry of `VCAP_SERVICES`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct VcapService {
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub label: String,
    #[serde(deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub plan: String,
    pub credentials: serde_json::Value,
}

/// Deserialize an explicit JSON `null` as the field's default
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// `VCAP_SERVICES`: service label to bound instances
pub type VcapServices = BTreeMap<String, Vec<VcapService>>;

/// How an instance became eligible for binding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceOrigin {
    /// Brokered service, matched through its tags
    Tagged,
    /// User-provided service, always a candidate
    UserProvided,
}

/// A bound service instance visible to the build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceInstance {
    pub name: String,
    pub label: String,
    pub tags: Vec<String>,
    pub origin: ServiceOrigin,
}

impl ServiceInstance {
    /// Whether any of the instance's tags equals one of `required` (ASCII case-insensitive)
    pub fn has_any_tag(&self, required: &[String]) -> bool {
        self.tags
            .iter()
            .any(|tag| required.iter().any(|r| r.eq_ignore_ascii_case(tag)))
    }
}

/// Flatten `VCAP_SERVICES` into instances in discovery order:
/// labels in lexical order, instances in document order within a label.
pub fn instances_from_vcap(services: &VcapServices) -> Vec<ServiceInstance> {
    services
        .iter()
        .flat_map(|(label, instances)| {
            let origin = if label == USER_PROVIDED_LABEL {
                ServiceOrigin::UserProvided
            } else {
                ServiceOrigin::Tagged
            };
            instances.iter().map(move |s| ServiceInstance {
                name: s.name.clone(),
                label: label.clone(),
                tags: s.tags.clone(),
                origin,
            })
        })
        .collect()
}

/// Candidates for a template, before any deduplication
#[derive(Debug, Default)]
pub struct MatchedInstances<'a> {
    /// Instances carrying at least one required tag
    pub tagged: Vec<&'a ServiceInstance>,
    /// Every user-provided instance
    pub user_provided: Vec<&'a ServiceInstance>,
}

/// Find the instances a template with `required_tags` could bind to.
///
/// A user-provided instance that also carries a required tag appears in
/// both sequences.
pub fn matching_instances<'a>(
    required_tags: &[String],
    instances: &'a [ServiceInstance],
) -> MatchedInstances<'a> {
    let tagged = instances
        .iter()
        .filter(|i| i.has_any_tag(required_tags))
        .collect();
    let user_provided = instances
        .iter()
        .filter(|i| i.origin == ServiceOrigin::UserProvided)
        .collect();

    MatchedInstances {
        tagged,
        user_provided,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instance(name: &str, tags: &[&str], origin: ServiceOrigin) -> ServiceInstance {
        ServiceInstance {
            name: name.to_string(),
            label: "test".to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            origin,
        }
    }

    fn tags(list: &[&str]) -> Vec<String> {
        list.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn tag_match_is_case_insensitive() {
        let i = instance("es", &["ElasticSearch", "search"], ServiceOrigin::Tagged);
        assert!(i.has_any_tag(&tags(&["elasticsearch"])));
        assert!(!i.has_any_tag(&tags(&["db"])));
        assert!(!i.has_any_tag(&[]));
    }

    #[test]
    fn single_tag_is_enough_and_counted_once() {
        let instances = vec![instance("mydb", &["db", "sql"], ServiceOrigin::Tagged)];
        let matched = matching_instances(&tags(&["db", "sql"]), &instances);
        assert_eq!(matched.tagged.len(), 1);
    }

    #[test]
    fn user_provided_always_included() {
        let instances = vec![
            instance("cache", &["redis"], ServiceOrigin::Tagged),
            instance("ups", &[], ServiceOrigin::UserProvided),
            instance("mydb", &["db"], ServiceOrigin::Tagged),
        ];
        let matched = matching_instances(&tags(&["db"]), &instances);

        let tagged: Vec<&str> = matched.tagged.iter().map(|i| i.name.as_str()).collect();
        let ups: Vec<&str> = matched.user_provided.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(tagged, vec!["mydb"]);
        assert_eq!(ups, vec!["ups"]);
    }

    #[test]
    fn no_dedup_across_sequences() {
        let instances = vec![instance("ups-db", &["db"], ServiceOrigin::UserProvided)];
        let matched = matching_instances(&tags(&["db"]), &instances);
        assert_eq!(matched.tagged.len(), 1);
        assert_eq!(matched.user_provided.len(), 1);
    }

    #[test]
    fn vcap_flattening_marks_user_provided() {
        let json = r#"{
            "user-provided": [{"name": "ups", "tags": []}],
            "elasticsearch": [
                {"name": "es-1", "tags": ["elasticsearch"]},
                {"name": "es-2", "tags": ["elasticsearch"]}
            ]
        }"#;
        let services: VcapServices = serde_json::from_str(json).unwrap();
        let instances = instances_from_vcap(&services);

        let names: Vec<&str> = instances.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["es-1", "es-2", "ups"]);
        assert_eq!(instances[0].origin, ServiceOrigin::Tagged);
        assert_eq!(instances[2].origin, ServiceOrigin::UserProvided);
        assert_eq!(instances[0].label, "elasticsearch");
    }
}

//! Tool registry with keyword and predicate trigger matching.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use bcommon::Registry;
use bdispatch::{Message, ToolDescriptor};

use crate::{ToolError, ToolRegistration};

#[derive(Default)]
struct RegistryIndex {
    by_name: Registry<String, Arc<ToolRegistration>>,
    /// keyword -> registered names, in registration order per keyword. A
    /// BTreeMap keeps the keyword scan order deterministic across calls.
    keyword_index: BTreeMap<String, Vec<String>>,
    /// Names carrying a custom predicate, in registration order.
    predicate_order: Vec<String>,
}

impl RegistryIndex {
    /// Drops every index entry for `name` so a re-registration cannot leave
    /// stale triggers behind.
    fn purge(&mut self, name: &str) {
        for names in self.keyword_index.values_mut() {
            names.retain(|existing| existing != name);
        }
        self.keyword_index.retain(|_, names| !names.is_empty());
        self.predicate_order.retain(|existing| existing != name);
    }
}

/// Maps registered callbacks to trigger conditions and produces the candidate
/// tool list for a user message. Shared behind `Arc`; interior lock keeps
/// registration safe alongside concurrent matching.
#[derive(Default)]
pub struct ToolRegistry {
    index: RwLock<RegistryIndex>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tool under its function name. Re-registering a name
    /// overwrites the previous entry, triggers included.
    pub fn register(&self, registration: ToolRegistration) {
        let mut index = self.write_index();
        let name = registration.name().to_string();
        index.purge(&name);

        for keyword in &registration.trigger().keywords {
            index
                .keyword_index
                .entry(keyword.clone())
                .or_default()
                .push(name.clone());
        }
        if registration.trigger().predicate.is_some() {
            index.predicate_order.push(name.clone());
        }
        index.by_name.insert(name, Arc::new(registration));
    }

    /// Returns the de-duplicated candidate descriptors for `content`:
    /// keyword-substring hits first (keywords scanned in lexicographic
    /// order), then predicate hits in registration order. First occurrence of
    /// a function name wins; unmatched content yields an empty vec.
    pub fn matches(&self, content: &str) -> Vec<ToolDescriptor> {
        let index = self.read_index();
        let mut seen = HashSet::new();
        let mut descriptors = Vec::new();

        for (keyword, names) in &index.keyword_index {
            if !content.contains(keyword.as_str()) {
                continue;
            }
            for name in names {
                if let Some(registration) = index.by_name.get(name)
                    && seen.insert(name.clone())
                {
                    descriptors.push(registration.descriptor().clone());
                }
            }
        }

        for name in &index.predicate_order {
            let Some(registration) = index.by_name.get(name) else {
                continue;
            };
            let Some(predicate) = &registration.trigger().predicate else {
                continue;
            };
            if predicate(content) && seen.insert(name.clone()) {
                descriptors.push(registration.descriptor().clone());
            }
        }

        descriptors
    }

    /// Invokes the named tool and wraps its output as a tool-role message
    /// tagged with `call_id` for correlation.
    pub async fn invoke(
        &self,
        name: &str,
        call_id: &str,
        args_json: &str,
    ) -> Result<Message, ToolError> {
        let callback = {
            let index = self.read_index();
            let registration = index.by_name.get(name).ok_or_else(|| {
                ToolError::not_found(format!("tool '{name}' is not registered"))
                    .with_tool_name(name)
                    .with_tool_call_id(call_id)
            })?;
            registration.callback()
        };

        let output = callback.call(args_json).await.map_err(|error| {
            error
                .with_tool_name(name)
                .with_tool_call_id(call_id)
        })?;

        Ok(Message::tool_result(call_id, output))
    }

    pub fn get(&self, name: &str) -> Option<Arc<ToolRegistration>> {
        self.read_index().by_name.get(name).cloned()
    }

    pub fn remove(&self, name: &str) -> Option<Arc<ToolRegistration>> {
        let mut index = self.write_index();
        index.purge(name);
        index.by_name.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.read_index().by_name.contains_key(name)
    }

    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.read_index()
            .by_name
            .values()
            .map(|registration| registration.descriptor().clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.read_index().by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_index().by_name.is_empty()
    }

    fn read_index(&self) -> RwLockReadGuard<'_, RegistryIndex> {
        self.index.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_index(&self) -> RwLockWriteGuard<'_, RegistryIndex> {
        self.index.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use bdispatch::{FunctionParameters, FunctionSpec, Role};

    use super::*;
    use crate::{FunctionCallback, ToolErrorKind};

    fn spec(name: &str) -> FunctionSpec {
        FunctionSpec {
            name: name.to_string(),
            description: format!("test tool {name}"),
            parameters: FunctionParameters::object(),
        }
    }

    fn echo_registration(name: &str) -> ToolRegistration {
        ToolRegistration::new(
            spec(name),
            FunctionCallback::new(|args| async move { Ok(args) }),
        )
    }

    #[test]
    fn keyword_substring_match_returns_the_tool() {
        let registry = ToolRegistry::new();
        registry.register(echo_registration("get_weather").with_keywords(["天气"]));

        let matched = registry.matches("今天泉州的天气怎么样");
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].function.name, "get_weather");
    }

    #[test]
    fn unrelated_content_matches_nothing() {
        let registry = ToolRegistry::new();
        registry.register(echo_registration("get_weather").with_keywords(["天气"]));

        assert!(registry.matches("讲个笑话吧").is_empty());
    }

    #[test]
    fn multiple_keywords_of_one_tool_never_duplicate_it() {
        let registry = ToolRegistry::new();
        registry.register(echo_registration("get_weather").with_keywords(["天气", "气温"]));

        let matched = registry.matches("天气和气温都想知道");
        assert_eq!(matched.len(), 1);
    }

    #[test]
    fn reregistering_a_name_keeps_exactly_one_entry() {
        let registry = ToolRegistry::new();
        registry.register(echo_registration("lookup").with_keywords(["old"]));
        registry.register(echo_registration("lookup").with_keywords(["new"]));

        assert_eq!(registry.len(), 1);
        assert!(registry.matches("old trigger word").is_empty());
        assert_eq!(registry.matches("new trigger word").len(), 1);
    }

    #[test]
    fn predicate_trigger_joins_keyword_hits() {
        let registry = ToolRegistry::new();
        registry.register(echo_registration("by_keyword").with_keywords(["alpha"]));
        registry.register(
            echo_registration("by_predicate").with_predicate(|content| content.ends_with('?')),
        );

        let matched = registry.matches("alpha question?");
        let names: Vec<_> = matched
            .iter()
            .map(|descriptor| descriptor.function.name.as_str())
            .collect();
        assert_eq!(names, vec!["by_keyword", "by_predicate"]);
    }

    #[test]
    fn keyword_scan_order_is_lexicographic() {
        let registry = ToolRegistry::new();
        registry.register(echo_registration("second").with_keywords(["bbb"]));
        registry.register(echo_registration("first").with_keywords(["aaa"]));

        let matched = registry.matches("aaa bbb");
        let names: Vec<_> = matched
            .iter()
            .map(|descriptor| descriptor.function.name.as_str())
            .collect();
        assert_eq!(names, vec!["first", "second"]);
    }

    #[test]
    fn remove_drops_triggers_too() {
        let registry = ToolRegistry::new();
        registry.register(echo_registration("lookup").with_keywords(["find"]));

        assert!(registry.remove("lookup").is_some());
        assert!(registry.is_empty());
        assert!(registry.matches("find something").is_empty());
    }

    #[tokio::test]
    async fn invoke_wraps_output_as_correlated_tool_message() {
        let registry = ToolRegistry::new();
        registry.register(ToolRegistration::new(
            spec("get_weather"),
            FunctionCallback::new(|_args| async move { Ok("{\"temp\":\"27\"}".to_string()) }),
        ));

        let message = registry
            .invoke("get_weather", "call_1", "{\"city\":\"泉州\"}")
            .await
            .expect("invoke should succeed");

        assert_eq!(message.role, Role::Tool);
        assert_eq!(message.text(), "{\"temp\":\"27\"}");
        assert_eq!(message.tool_call_id.as_deref(), Some("call_1"));
    }

    #[tokio::test]
    async fn invoke_unknown_name_is_not_found() {
        let registry = ToolRegistry::new();

        let error = registry
            .invoke("missing", "call_2", "{}")
            .await
            .expect_err("invoke should fail");

        assert_eq!(error.kind, ToolErrorKind::NotFound);
        assert_eq!(error.tool_call_id.as_deref(), Some("call_2"));
    }

    #[tokio::test]
    async fn invoke_propagates_callback_failure_with_context() {
        let registry = ToolRegistry::new();
        registry.register(ToolRegistration::new(
            spec("broken"),
            FunctionCallback::new(|_args| async move {
                Err(ToolError::invocation("tool exploded"))
            }),
        ));

        let error = registry
            .invoke("broken", "call_3", "{}")
            .await
            .expect_err("invoke should fail");

        assert_eq!(error.kind, ToolErrorKind::Invocation);
        assert_eq!(error.tool_name.as_deref(), Some("broken"));
    }
}

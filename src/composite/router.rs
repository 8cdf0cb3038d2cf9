//! Router composite - classify, then delegate to exactly one specialist.

use crate::composite::enforce_output_contract;
use crate::error::OrchestrationError;
use crate::state::{StateDelta, StateSnapshot};
use crate::tooling::ToolInvoker;
use crate::unit::{TerminationReason, UnitOutput, WorkUnit};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

const DEFAULT_CLARIFICATION: &str =
    "I couldn't tell what you need. Could you rephrase your request?";

/// What a router does with input the classifier maps to no configured
/// category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteFallback {
    /// Return a clarification request to the caller with termination
    /// `no-route-matched`; resolution is left to the caller.
    Clarify(String),
    /// Raise `RouteUnmatched`.
    Fail,
}

impl Default for RouteFallback {
    fn default() -> Self {
        Self::Clarify(DEFAULT_CLARIFICATION.to_string())
    }
}

/// Dispatches to exactly one specialist per turn.
///
/// The router first invokes its classifier, a work unit producing a text
/// category from a closed set declared by the route table. It then invokes
/// the one specialist mapped to that category with the original input and a
/// view including the classifier's writes. It never invokes more than one
/// specialist, and it never guesses: an unmatched category resolves through
/// the configured [`RouteFallback`] rather than silently defaulting to a
/// specialist.
pub struct RouterUnit {
    name: String,
    classifier: Arc<dyn WorkUnit>,
    routes: HashMap<String, Arc<dyn WorkUnit>>,
    categories: Vec<String>,
    fallback: RouteFallback,
}

impl RouterUnit {
    /// Start building a router around a classifier unit.
    pub fn builder(name: impl Into<String>, classifier: Arc<dyn WorkUnit>) -> RouterBuilder {
        RouterBuilder {
            name: name.into(),
            classifier,
            routes: Vec::new(),
            fallback: RouteFallback::default(),
        }
    }

    /// The configured categories, in declaration order.
    pub fn categories(&self) -> &[String] {
        &self.categories
    }
}

/// Builder validating the route table at composition time.
pub struct RouterBuilder {
    name: String,
    classifier: Arc<dyn WorkUnit>,
    routes: Vec<(String, Arc<dyn WorkUnit>)>,
    fallback: RouteFallback,
}

impl RouterBuilder {
    /// Map a category to its specialist.
    pub fn route(mut self, category: impl Into<String>, specialist: Arc<dyn WorkUnit>) -> Self {
        self.routes.push((category.into(), specialist));
        self
    }

    /// Replace the fallback behavior for unmatched input.
    pub fn fallback(mut self, fallback: RouteFallback) -> Self {
        self.fallback = fallback;
        self
    }

    /// Finish the router.
    ///
    /// Fails if no route is configured or a category appears twice.
    pub fn build(self) -> Result<RouterUnit, OrchestrationError> {
        if self.routes.is_empty() {
            return Err(OrchestrationError::invalid_composition(
                self.name,
                "router requires at least one route",
            ));
        }
        let mut routes = HashMap::with_capacity(self.routes.len());
        let mut categories = Vec::with_capacity(self.routes.len());
        for (category, specialist) in self.routes {
            if routes.insert(category.clone(), specialist).is_some() {
                return Err(OrchestrationError::invalid_composition(
                    self.name,
                    format!("duplicate route category '{category}'"),
                ));
            }
            categories.push(category);
        }
        Ok(RouterUnit {
            name: self.name,
            classifier: self.classifier,
            routes,
            categories,
            fallback: self.fallback,
        })
    }
}

#[async_trait]
impl WorkUnit for RouterUnit {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_composite(&self) -> bool {
        true
    }

    fn sub_units(&self) -> Vec<Arc<dyn WorkUnit>> {
        let mut units: Vec<Arc<dyn WorkUnit>> = vec![self.classifier.clone()];
        for category in &self.categories {
            units.push(self.routes[category].clone());
        }
        units
    }

    async fn invoke(
        &self,
        input: Value,
        state: StateSnapshot,
        _tools: &ToolInvoker,
    ) -> Result<UnitOutput, OrchestrationError> {
        let invoker = ToolInvoker::for_unit(self.classifier.as_ref());
        let classified = match self
            .classifier
            .invoke(input.clone(), state.clone(), &invoker)
            .await
        {
            Ok(output) => output,
            Err(e) => {
                return Err(e.in_composite(
                    &self.name,
                    self.classifier.name(),
                    0,
                    StateDelta::new(),
                ));
            }
        };
        if let Err(e) = enforce_output_contract(self.classifier.as_ref(), &classified) {
            return Err(e.in_composite(&self.name, self.classifier.name(), 0, StateDelta::new()));
        }

        let category = match classified.value.as_str() {
            Some(category) => category.trim().to_string(),
            None => {
                let e = OrchestrationError::unit_failure(
                    self.classifier.name(),
                    "classifier must produce a text category",
                );
                return Err(e.in_composite(
                    &self.name,
                    self.classifier.name(),
                    0,
                    StateDelta::new(),
                ));
            }
        };

        let specialist = match self.routes.get(&category) {
            Some(specialist) => specialist,
            None => {
                tracing::debug!(
                    router = %self.name,
                    category,
                    "no route matched, returning clarification request"
                );
                return match &self.fallback {
                    RouteFallback::Clarify(message) => Ok(UnitOutput {
                        value: Value::String(message.clone()),
                        mutations: classified.mutations,
                        termination: TerminationReason::NoRouteMatched,
                        ..UnitOutput::default()
                    }),
                    RouteFallback::Fail => Err(OrchestrationError::route_unmatched(category)),
                };
            }
        };

        tracing::debug!(
            router = %self.name,
            category,
            specialist = specialist.name(),
            "delegating to specialist"
        );

        let view = state.overlay(&classified.mutations);
        let invoker = ToolInvoker::for_unit(specialist.as_ref());
        let output = match specialist.invoke(input, view, &invoker).await {
            Ok(output) => output,
            Err(e) => {
                return Err(e.in_composite(
                    &self.name,
                    specialist.name(),
                    1,
                    classified.mutations,
                ));
            }
        };
        if let Err(e) = enforce_output_contract(specialist.as_ref(), &output) {
            return Err(e.in_composite(&self.name, specialist.name(), 1, classified.mutations));
        }

        let mut mutations = classified.mutations;
        mutations.merge(&output.mutations);
        Ok(UnitOutput {
            value: output.value,
            mutations,
            signal: output.signal,
            termination: output.termination,
            failures: output.failures,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composite::tests_support::ScriptedUnit;
    use serde_json::json;

    fn classifier(category: &'static str) -> Arc<ScriptedUnit> {
        Arc::new(
            ScriptedUnit::new("intent", move |_, _, _| {
                Ok(UnitOutput::keyed("intent", json!(category)))
            })
            .with_output_key("intent"),
        )
    }

    fn specialist(name: &'static str, key: &'static str) -> Arc<ScriptedUnit> {
        Arc::new(
            ScriptedUnit::new(name, move |_, input, _| {
                Ok(UnitOutput::keyed(
                    key,
                    json!(format!("{name} handled {input}")),
                ))
            })
            .with_output_key(key),
        )
    }

    #[tokio::test]
    async fn test_exactly_one_specialist_runs() {
        let greeter = specialist("greeter", "greeting_response");
        let analyzer = specialist("incident_analyzer", "incident_report");
        let greeter_probe = Arc::clone(&greeter);
        let analyzer_probe = Arc::clone(&analyzer);

        let router = RouterUnit::builder("front_desk", classifier("incident"))
            .route("greet", greeter)
            .route("incident", analyzer)
            .build()
            .unwrap();

        let output = router
            .invoke(
                json!("my GKE cluster is down"),
                StateSnapshot::empty(),
                &ToolInvoker::empty(),
            )
            .await
            .unwrap();

        assert_eq!(analyzer_probe.invocations(), 1);
        assert_eq!(greeter_probe.invocations(), 0);
        assert_eq!(output.termination, TerminationReason::Completed);
        assert!(output.mutations.contains("intent"));
        assert!(output.mutations.contains("incident_report"));
    }

    #[tokio::test]
    async fn test_specialist_sees_classifier_writes() {
        let reader = Arc::new(
            ScriptedUnit::new("reader", |_, _, state| {
                let intent = state.get("intent").cloned().unwrap_or(Value::Null);
                Ok(UnitOutput::keyed("seen_intent", intent))
            })
            .with_output_key("seen_intent"),
        );

        let router = RouterUnit::builder("front_desk", classifier("greet"))
            .route("greet", reader)
            .build()
            .unwrap();

        let output = router
            .invoke(json!("hello"), StateSnapshot::empty(), &ToolInvoker::empty())
            .await
            .unwrap();

        assert_eq!(output.mutations.get("seen_intent"), Some(&json!("greet")));
    }

    #[tokio::test]
    async fn test_unmatched_category_clarifies() {
        let greeter = specialist("greeter", "greeting_response");
        let greeter_probe = Arc::clone(&greeter);

        let router = RouterUnit::builder("front_desk", classifier("gibberish"))
            .route("greet", greeter)
            .build()
            .unwrap();

        let output = router
            .invoke(json!("asdfgh"), StateSnapshot::empty(), &ToolInvoker::empty())
            .await
            .unwrap();

        assert_eq!(output.termination, TerminationReason::NoRouteMatched);
        assert_eq!(greeter_probe.invocations(), 0);
        assert!(output.value.as_str().unwrap().contains("rephrase"));
        // The classifier's own write is still recorded.
        assert_eq!(output.mutations.get("intent"), Some(&json!("gibberish")));
    }

    #[tokio::test]
    async fn test_unmatched_category_can_fail() {
        let router = RouterUnit::builder("front_desk", classifier("gibberish"))
            .route("greet", specialist("greeter", "greeting_response"))
            .fallback(RouteFallback::Fail)
            .build()
            .unwrap();

        let error = router
            .invoke(json!("asdfgh"), StateSnapshot::empty(), &ToolInvoker::empty())
            .await
            .unwrap_err();

        match error {
            OrchestrationError::RouteUnmatched { category } => {
                assert_eq!(category, "gibberish")
            }
            other => panic!("expected RouteUnmatched, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_non_text_classifier_output_is_failure() {
        let bad_classifier = Arc::new(
            ScriptedUnit::new("intent", |_, _, _| {
                Ok(UnitOutput::keyed("intent", json!(42)))
            })
            .with_output_key("intent"),
        );

        let router = RouterUnit::builder("front_desk", bad_classifier)
            .route("greet", specialist("greeter", "greeting_response"))
            .build()
            .unwrap();

        let error = router
            .invoke(json!("hi"), StateSnapshot::empty(), &ToolInvoker::empty())
            .await
            .unwrap_err();
        assert!(error.to_string().contains("text category"));
    }

    #[test]
    fn test_builder_rejects_duplicates_and_empty() {
        let empty = RouterUnit::builder("front_desk", classifier("greet")).build();
        assert!(empty.is_err());

        let duplicated = RouterUnit::builder("front_desk", classifier("greet"))
            .route("greet", specialist("a", "ka"))
            .route("greet", specialist("b", "kb"))
            .build();
        match duplicated {
            Err(OrchestrationError::InvalidComposition { message, .. }) => {
                assert!(message.contains("duplicate"))
            }
            other => panic!("expected InvalidComposition, got {:?}", other.map(|_| ())),
        }
    }
}

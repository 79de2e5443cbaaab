//! Link templates for the trace detail view.
//!
//! Templates contain `${...}` placeholders that the trace panel fills in for
//! each trace, span or attribute, so they must survive URL encoding untouched.
//! The current page's query parameters are carried over into trace and span
//! links, giving the detail page a way back to the search it came from.

use crate::domain::error::{Result, TracelensError};
use crate::transform::Attributes;
use serde::{Deserialize, Serialize};
use url::{form_urlencoded, Url};

/// Query parameter selecting a span on the detail page.
pub const SELECT_SPAN_PARAM: &str = "selectSpan";

const SPAN_ID_MARKER: &str = "SPANID";

/// `[links]` section of the configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinksConfig {
    /// Path of the trace detail route, without trailing slash.
    pub base_path: String,
}

impl Default for LinksConfig {
    fn default() -> Self {
        Self {
            base_path: "/observe/traces".to_string(),
        }
    }
}

/// Query parameters of `current_url`, which may be absolute (`https://host/a?b=c`),
/// a path (`/a?b=c`) or just a query (`?b=c`).
fn search_params(current_url: &str) -> Result<Vec<(String, String)>> {
    let base = Url::parse("http://console.local/")
        .map_err(|e| TracelensError::Link(format!("invalid base URL: {e}")))?;
    let url = Url::options()
        .base_url(Some(&base))
        .parse(current_url)
        .map_err(|e| TracelensError::Link(format!("invalid URL `{current_url}`: {e}")))?;

    Ok(url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect())
}

fn encode_params(params: &[(String, String)]) -> String {
    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params)
        .finish()
}

fn detail_link(config: &LinksConfig, query: &str) -> String {
    format!("{}/${{traceId}}?{query}", config.base_path.trim_end_matches('/'))
}

/// Template of the link from a span to its trace's detail page.
///
/// # Errors
///
/// Returns [`TracelensError::Link`] if `current_url` is not a valid URL.
///
/// # Example
///
/// ```
/// use tracelens::links::{link_to_trace, LinksConfig};
///
/// let link = link_to_trace("/observe/traces?namespace=tempo&q=%7B%7D", &LinksConfig::default())?;
/// assert_eq!(link, "/observe/traces/${traceId}?namespace=tempo&q=%7B%7D");
/// # Ok::<(), tracelens::TracelensError>(())
/// ```
pub fn link_to_trace(current_url: &str, config: &LinksConfig) -> Result<String> {
    let params = search_params(current_url)?;
    Ok(detail_link(config, &encode_params(&params)))
}

/// Template of the link to a span on its trace's detail page.
///
/// Same as [`link_to_trace`] with `selectSpan=${spanId}` set; any previous
/// `selectSpan` values are replaced.
///
/// # Errors
///
/// Returns [`TracelensError::Link`] if `current_url` is not a valid URL.
pub fn link_to_span(current_url: &str, config: &LinksConfig) -> Result<String> {
    let mut params = search_params(current_url)?;

    match params.iter().position(|(k, _)| k == SELECT_SPAN_PARAM) {
        Some(first) => {
            params[first].1 = SPAN_ID_MARKER.to_string();
            let mut index = 0;
            params.retain(|(k, _)| {
                let keep = index <= first || k != SELECT_SPAN_PARAM;
                index += 1;
                keep
            });
        }
        None => params.push((SELECT_SPAN_PARAM.to_string(), SPAN_ID_MARKER.to_string())),
    }

    // the placeholder must not be URL-encoded, so it goes in after encoding
    let query = encode_params(&params).replacen(SPAN_ID_MARKER, "${spanId}", 1);
    Ok(detail_link(config, &query))
}

/// A link offered for a span attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AttributeLink {
    /// Attribute the link is shown for.
    pub name: &'static str,
    /// URL template. Variables are attribute keys with `.` replaced by `_`.
    pub link: &'static str,
}

/// Console pages for Kubernetes resource attributes.
pub const SPAN_ATTRIBUTE_LINKS: [AttributeLink; 4] = [
    AttributeLink {
        name: "k8s.namespace.name",
        link: "/k8s/cluster/namespaces/${k8s_namespace_name:percentencode}",
    },
    AttributeLink {
        name: "k8s.node.name",
        link: "/k8s/cluster/nodes/${k8s_node_name:percentencode}",
    },
    AttributeLink {
        name: "k8s.deployment.name",
        link: "/k8s/ns/${k8s_namespace_name:percentencode}/deployments/${k8s_deployment_name:percentencode}",
    },
    AttributeLink {
        name: "k8s.pod.name",
        link: "/k8s/ns/${k8s_namespace_name:percentencode}/pods/${k8s_pod_name:percentencode}",
    },
];

/// Marks a URI component may carry unescaped but form encoding escapes.
const URI_COMPONENT_MARKS: [(&str, &str); 5] =
    [("%21", "!"), ("%27", "'"), ("%28", "("), ("%29", ")"), ("%7E", "~")];

/// Percent-encodes a URI component: everything except ASCII alphanumerics and
/// `- _ . ! ~ * ' ( )` is escaped, spaces as `%20`.
fn percent_encode(value: &str) -> String {
    let encoded = form_urlencoded::byte_serialize(value.as_bytes())
        .collect::<String>()
        .replace('+', "%20");
    URI_COMPONENT_MARKS
        .iter()
        .fold(encoded, |encoded, (escaped, mark)| encoded.replace(escaped, mark))
}

impl AttributeLink {
    /// Fills in the template from attribute maps, searched in order.
    ///
    /// Returns `None` if the link's own attribute is missing or any variable
    /// cannot be resolved to a string attribute.
    ///
    /// ```
    /// use tracelens::links::SPAN_ATTRIBUTE_LINKS;
    /// use tracelens::otlp::{AnyValue, KeyValue};
    /// use tracelens::transform::Attributes;
    ///
    /// let resource: Attributes = [
    ///     KeyValue::new("k8s.namespace.name", AnyValue::from("shop")),
    ///     KeyValue::new("k8s.pod.name", AnyValue::from("cart-7d9f")),
    /// ]
    /// .iter()
    /// .collect();
    ///
    /// let pod = &SPAN_ATTRIBUTE_LINKS[3];
    /// assert_eq!(pod.resolve(&[&resource]).as_deref(), Some("/k8s/ns/shop/pods/cart-7d9f"));
    /// ```
    #[must_use]
    pub fn resolve(&self, attributes: &[&Attributes]) -> Option<String> {
        let lookup = |variable: &str| {
            attributes.iter().find_map(|map| {
                map.iter()
                    .find(|(key, _)| key.replace('.', "_") == variable)
                    .and_then(|(_, value)| value.as_str())
            })
        };

        lookup(&self.name.replace('.', "_"))?;

        let mut resolved = String::with_capacity(self.link.len());
        let mut rest = self.link;
        while let Some(start) = rest.find("${") {
            resolved.push_str(&rest[..start]);
            let end = rest[start..].find('}')? + start;
            let (variable, format) = match rest[start + 2..end].split_once(':') {
                Some((variable, format)) => (variable, Some(format)),
                None => (&rest[start + 2..end], None),
            };

            let value = lookup(variable)?;
            match format {
                Some("percentencode") => resolved.push_str(&percent_encode(value)),
                _ => resolved.push_str(value),
            }
            rest = &rest[end + 1..];
        }
        resolved.push_str(rest);
        Some(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::otlp::{AnyValue, KeyValue};

    fn attributes(pairs: &[(&str, &str)]) -> Attributes {
        pairs
            .iter()
            .map(|(k, v)| KeyValue::new(*k, AnyValue::from(*v)))
            .collect::<Vec<_>>()
            .iter()
            .collect()
    }

    #[test]
    fn test_trace_link_keeps_search_params() {
        let link = link_to_trace(
            "https://console.example.com/observe/traces?namespace=tempo&name=simplest&q=%7B+%7D",
            &LinksConfig::default(),
        )
        .unwrap();
        assert_eq!(link, "/observe/traces/${traceId}?namespace=tempo&name=simplest&q=%7B+%7D");
    }

    #[test]
    fn test_trace_link_without_params() {
        let link = link_to_trace("/observe/traces", &LinksConfig::default()).unwrap();
        assert_eq!(link, "/observe/traces/${traceId}?");
    }

    #[test]
    fn test_span_link_appends_placeholder() {
        let link = link_to_span("?namespace=tempo", &LinksConfig::default()).unwrap();
        assert_eq!(link, "/observe/traces/${traceId}?namespace=tempo&selectSpan=${spanId}");
    }

    #[test]
    fn test_span_link_replaces_existing_selection() {
        let link = link_to_span(
            "?selectSpan=aaa&namespace=tempo&selectSpan=bbb",
            &LinksConfig::default(),
        )
        .unwrap();
        assert_eq!(link, "/observe/traces/${traceId}?selectSpan=${spanId}&namespace=tempo");
    }

    #[test]
    fn test_custom_base_path() {
        let config = LinksConfig {
            base_path: "/tracing/".to_string(),
        };
        assert_eq!(link_to_trace("?a=1", &config).unwrap(), "/tracing/${traceId}?a=1");
    }

    #[test]
    fn test_percent_encode_leaves_uri_component_marks() {
        assert_eq!(percent_encode("a b~!'()*-_.z"), "a%20b~!'()*-_.z");
        assert_eq!(percent_encode("ns/x%21+?"), "ns%2Fx%2521%2B%3F");
        assert_eq!(percent_encode("é"), "%C3%A9");
    }

    #[test]
    fn test_invalid_url() {
        assert!(matches!(
            link_to_trace("http://[::1", &LinksConfig::default()),
            Err(TracelensError::Link(_))
        ));
    }

    #[test]
    fn test_attribute_link_percent_encodes() {
        let attrs = attributes(&[("k8s.namespace.name", "my ns/1")]);
        assert_eq!(
            SPAN_ATTRIBUTE_LINKS[0].resolve(&[&attrs]).as_deref(),
            Some("/k8s/cluster/namespaces/my%20ns%2F1")
        );
    }

    #[test]
    fn test_attribute_link_searches_maps_in_order() {
        let span = attributes(&[("k8s.deployment.name", "cart")]);
        let resource = attributes(&[("k8s.namespace.name", "shop"), ("k8s.deployment.name", "other")]);
        assert_eq!(
            SPAN_ATTRIBUTE_LINKS[2].resolve(&[&span, &resource]).as_deref(),
            Some("/k8s/ns/shop/deployments/cart")
        );
    }

    #[test]
    fn test_attribute_link_requires_all_variables() {
        let attrs = attributes(&[("k8s.pod.name", "cart-1")]);
        assert_eq!(SPAN_ATTRIBUTE_LINKS[3].resolve(&[&attrs]), None);
    }

    #[test]
    fn test_attribute_link_requires_own_attribute() {
        let attrs = attributes(&[("k8s.namespace.name", "shop")]);
        assert_eq!(SPAN_ATTRIBUTE_LINKS[1].resolve(&[&attrs]), None);
    }
}

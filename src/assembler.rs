use crate::types::{AggregatorError, Result};
use serde_yaml::Value;

/// Merge the accepted entries into the template document and serialize it.
///
/// The template's `proxies` field is replaced with the entry list, and every
/// element of `proxy-groups` has the accepted names appended to its own
/// `proxies` member (created when absent or malformed). A template without a
/// `proxy-groups` list is merged as-is. Entry order is preserved throughout.
pub fn assemble(mut template: Value, entries: Vec<Value>) -> Result<String> {
    let names: Vec<Value> = entries
        .iter()
        .filter_map(|entry| entry.get("name").cloned())
        .collect();

    let root = template
        .as_mapping_mut()
        .ok_or_else(|| AggregatorError::Template("template root is not a mapping".to_string()))?;

    root.insert(
        Value::String("proxies".to_string()),
        Value::Sequence(entries),
    );

    if let Some(groups) = root
        .get_mut(Value::String("proxy-groups".to_string()))
        .and_then(Value::as_sequence_mut)
    {
        for group in groups {
            let group = match group.as_mapping_mut() {
                Some(group) => group,
                None => continue,
            };
            match group
                .get_mut(Value::String("proxies".to_string()))
                .and_then(Value::as_sequence_mut)
            {
                Some(members) => members.extend(names.iter().cloned()),
                None => {
                    group.insert(
                        Value::String("proxies".to_string()),
                        Value::Sequence(names.clone()),
                    );
                }
            }
        }
    }

    Ok(serde_yaml::to_string(&template)?)
}

/// Parse the template file contents into a generic document.
pub fn parse_template(text: &str) -> Result<Value> {
    Ok(serde_yaml::from_str(text)?)
}

use crate::core::constants::VECTOR_COLUMN;
use crate::data::Entity;
use crate::data::duckdb::filters::WhereClause;

/// Render one entity as a brace-delimited block of `key: value` lines.
///
/// Keys come out sorted; the embedding column is skipped.
pub fn format_entity(entity: &Entity) -> String {
    let mut out = String::from("{\n");
    for (key, value) in entity.iter().filter(|(k, _)| k.as_str() != VECTOR_COLUMN) {
        out.push_str("    ");
        out.push_str(key);
        out.push_str(": ");
        out.push_str(&value.to_string());
        out.push('\n');
    }
    out.push('}');
    out
}

pub fn format_entities(entities: &[Entity], filter: &WhereClause) -> String {
    let blocks: Vec<String> = entities.iter().map(format_entity).collect();
    format!(
        "Found {} entities matching {}:\n{}",
        entities.len(),
        filter,
        blocks.join("\n")
    )
}

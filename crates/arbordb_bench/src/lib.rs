//! Benchmark utilities.

use arbordb_core::{CoreResult, Graph, PropertyValue, VertexId};
use rand::Rng;

/// Generate a random lowercase name of `len` characters.
pub fn random_name(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len).map(|_| rng.gen_range(b'a'..=b'z') as char).collect()
}

/// Generate `count` random property values.
pub fn random_values(count: usize) -> Vec<PropertyValue> {
    let mut rng = rand::thread_rng();
    (0..count)
        .map(|i| match i % 3 {
            0 => PropertyValue::from(rng.gen::<i64>()),
            1 => PropertyValue::from(random_name(12)),
            _ => PropertyValue::from(rng.gen::<bool>()),
        })
        .collect()
}

/// Populate `graph` with `count` person vertices in batches.
///
/// Each vertex gets a `name`, an `age` and a `knows` edge to the previous
/// vertex of its batch. Returns the committed ids.
pub fn populate(graph: &Graph, count: usize, batch_size: usize) -> CoreResult<Vec<VertexId>> {
    let mut rng = rand::thread_rng();
    let mut ids = Vec::with_capacity(count);
    let batch_size = batch_size.max(1);

    for start in (0..count).step_by(batch_size) {
        let end = (start + batch_size).min(count);
        let created = graph.transaction(|tx| {
            let mut created = Vec::with_capacity(end - start);
            for i in start..end {
                let v = tx.add_vertex(Some("person"))?;
                tx.add_property(&v, "name", format!("person{i}"))?;
                tx.add_property(&v, "age", rng.gen_range(18..90i64))?;
                if let Some(previous) = created.last() {
                    tx.add_edge(&v, previous, "knows")?;
                }
                created.push(v);
            }
            Ok(created)
        })?;
        ids.extend(created.iter().map(|v| v.id()));
    }
    Ok(ids)
}

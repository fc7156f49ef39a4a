use airspace_shared::models::{Area, AreaType};
use redb::{
    Database, MultimapTable, MultimapTableDefinition, ReadableDatabase, ReadableMultimapTable,
    ReadableTable, ReadableTableMetadata, Table, TableDefinition,
};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

/// `"<type>/<area_id>"` → JSON-encoded `Area`.
const AREAS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("areas");

/// S2 cell id → area keys indexed under it.
const CELLS_TABLE: MultimapTableDefinition<u64, &str> = MultimapTableDefinition::new("cells_areas");

pub struct Storage {
    db: Database,
}

/// Areas of different types may share an id, so the type is part of the key.
fn area_key(area_type: AreaType, area_id: &str) -> String {
    format!("{}/{}", area_type, area_id)
}

fn put_area(
    areas: &mut Table<&'static str, &'static [u8]>,
    cells: &mut MultimapTable<u64, &'static str>,
    area: &Area,
) -> Result<(), String> {
    let key = area_key(area.area_type, &area.area_id);

    let previous: Option<Area> = match areas.get(key.as_str()).map_err(|e| e.to_string())? {
        Some(value) => Some(serde_json::from_slice(value.value()).map_err(|e| e.to_string())?),
        None => None,
    };
    if let Some(previous) = previous {
        for cell in &previous.cells {
            cells
                .remove(*cell, key.as_str())
                .map_err(|e| e.to_string())?;
        }
    }

    let json = serde_json::to_vec(area).map_err(|e| e.to_string())?;
    areas
        .insert(key.as_str(), json.as_slice())
        .map_err(|e| e.to_string())?;
    for cell in &area.cells {
        cells
            .insert(*cell, key.as_str())
            .map_err(|e| e.to_string())?;
    }
    Ok(())
}

impl Storage {
    pub fn open(path: &Path) -> Result<Arc<Self>, String> {
        let db = Database::create(path)
            .map_err(|e| format!("failed to open database at {}: {}", path.display(), e))?;

        // Ensure tables exist
        let write_txn = db.begin_write().map_err(|e| e.to_string())?;
        {
            write_txn.open_table(AREAS_TABLE).map_err(|e| e.to_string())?;
            write_txn
                .open_multimap_table(CELLS_TABLE)
                .map_err(|e| e.to_string())?;
        }
        write_txn.commit().map_err(|e| e.to_string())?;

        Ok(Arc::new(Storage { db }))
    }

    /// Upsert a batch of areas in one transaction. Each area's old cell index
    /// entries are replaced.
    pub fn insert_areas(&self, batch: &[Area]) -> Result<usize, String> {
        let write_txn = self.db.begin_write().map_err(|e| e.to_string())?;
        {
            let mut areas = write_txn.open_table(AREAS_TABLE).map_err(|e| e.to_string())?;
            let mut cells = write_txn
                .open_multimap_table(CELLS_TABLE)
                .map_err(|e| e.to_string())?;
            for area in batch {
                put_area(&mut areas, &mut cells, area)?;
            }
        }
        write_txn.commit().map_err(|e| e.to_string())?;
        Ok(batch.len())
    }

    /// Distinct areas of `area_type` indexed under any of `cells`, ordered by key.
    pub fn search_areas(&self, cells: &[u64], area_type: AreaType) -> Result<Vec<Area>, String> {
        let read_txn = self.db.begin_read().map_err(|e| e.to_string())?;
        let index = read_txn
            .open_multimap_table(CELLS_TABLE)
            .map_err(|e| e.to_string())?;
        let areas = read_txn.open_table(AREAS_TABLE).map_err(|e| e.to_string())?;

        let mut keys = BTreeSet::new();
        for cell in cells {
            for entry in index.get(*cell).map_err(|e| e.to_string())? {
                let entry = entry.map_err(|e| e.to_string())?;
                keys.insert(entry.value().to_string());
            }
        }

        let mut found = Vec::new();
        for key in keys {
            if let Some(value) = areas.get(key.as_str()).map_err(|e| e.to_string())? {
                let area: Area =
                    serde_json::from_slice(value.value()).map_err(|e| e.to_string())?;
                if area.area_type == area_type {
                    found.push(area);
                }
            }
        }
        Ok(found)
    }

    pub fn count_areas(&self) -> Result<u64, String> {
        let read_txn = self.db.begin_read().map_err(|e| e.to_string())?;
        let table = read_txn.open_table(AREAS_TABLE).map_err(|e| e.to_string())?;
        table.len().map_err(|e| e.to_string())
    }
}

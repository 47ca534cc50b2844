// ==========================================
// 物流批次跟踪系统 - 运单事件仓储
// ==========================================
// 对齐: schema shipment_event 表
// 红线: 只追加，不提供修改与删除
// ==========================================

use crate::domain::shipment::ShipmentEvent;
use crate::repository::error::RepositoryResult;
use crate::repository::row_utils::{format_ts, parse_ts};
use crate::repository::unit_of_work::{lock_conn, SharedConnection};
use rusqlite::{params, Connection};

pub struct ShipmentEventRepository {
    conn: SharedConnection,
}

impl ShipmentEventRepository {
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }

    /// 查询运单事件 (按创建时间升序)
    pub fn find_by_shipment(&self, shipment_id: i64) -> RepositoryResult<Vec<ShipmentEvent>> {
        let conn = lock_conn(&self.conn)?;
        Self::find_by_shipment_tx(&conn, shipment_id)
    }

    /// 追加事件
    ///
    /// # 返回
    /// - `Ok(id)`: 新事件 id (同时回填到 event.id)
    pub fn append_tx(tx: &Connection, event: &mut ShipmentEvent) -> RepositoryResult<i64> {
        tx.execute(
            r#"INSERT INTO shipment_event (
                shipment_id, event_type, actor_user_id, location, message, created_at
            ) VALUES (?, ?, ?, ?, ?, ?)"#,
            params![
                event.shipment_id,
                &event.event_type,
                event.actor_user_id,
                &event.location,
                &event.message,
                format_ts(&event.created_at),
            ],
        )?;
        event.id = tx.last_insert_rowid();
        Ok(event.id)
    }

    pub fn find_by_shipment_tx(
        tx: &Connection,
        shipment_id: i64,
    ) -> RepositoryResult<Vec<ShipmentEvent>> {
        let mut stmt = tx.prepare(
            r#"SELECT id, shipment_id, event_type, actor_user_id, location, message, created_at
               FROM shipment_event
               WHERE shipment_id = ?
               ORDER BY created_at ASC, id ASC"#,
        )?;
        let events = stmt
            .query_map(params![shipment_id], |row| {
                Ok(ShipmentEvent {
                    id: row.get(0)?,
                    shipment_id: row.get(1)?,
                    event_type: row.get(2)?,
                    actor_user_id: row.get(3)?,
                    location: row.get(4)?,
                    message: row.get(5)?,
                    created_at: parse_ts(6, &row.get::<_, String>(6)?)?,
                })
            })?
            .collect::<Result<Vec<ShipmentEvent>, _>>()?;
        Ok(events)
    }
}

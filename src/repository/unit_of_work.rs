// ==========================================
// 物流批次跟踪系统 - 工作单元 (事务边界)
// ==========================================
// 红线: 所有写用例在同一事务内完成读-改-写
// 红线: 以 BEGIN IMMEDIATE 开启，事务期间持有数据库写锁
// 红线: 未提交即丢弃时自动回滚
// ==========================================

use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::sync::{Arc, Mutex, MutexGuard};

/// 进程内共享连接
pub type SharedConnection = Arc<Mutex<Connection>>;

/// 获取共享连接
pub fn lock_conn(conn: &SharedConnection) -> RepositoryResult<MutexGuard<'_, Connection>> {
    conn.lock()
        .map_err(|e| RepositoryError::LockError(e.to_string()))
}

// ==========================================
// UnitOfWork
// ==========================================
pub struct UnitOfWork<'conn> {
    tx: Transaction<'conn>,
}

impl<'conn> UnitOfWork<'conn> {
    /// 开启工作单元
    pub fn begin(conn: &'conn mut Connection) -> RepositoryResult<Self> {
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(Self { tx })
    }

    /// 事务内连接
    pub fn tx(&self) -> &Transaction<'conn> {
        &self.tx
    }

    /// 提交
    pub fn commit(self) -> RepositoryResult<()> {
        self.tx
            .commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))
    }

    /// 显式回滚
    pub fn rollback(self) -> RepositoryResult<()> {
        self.tx
            .rollback()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))
    }
}

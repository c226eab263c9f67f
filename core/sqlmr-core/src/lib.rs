//! # sqlmr: SQL on map/shuffle/reduce
//!
//! sqlmr는 평면 구분자 테이블 파일에 대한 SELECT 쿼리를 맵/셔플/리듀스 잡으로
//! 컴파일하여 실행하는 엔진입니다.
//!
//! ## 지원 SQL
//!
//! - `SELECT [DISTINCT]` 상수, 컬럼(`table.n`, 1-based), `COUNT/SUM/MAX/MIN/AVG`
//! - `FROM main [JOIN t ON main.a = t.b [AND ...]]...` (브로드캐스트 해시 조인)
//! - `WHERE` 조건 트리 (`=`, `!=`, `LIKE`, `>`, `>=`, `<`, `<=`, `AND`, `OR`, 괄호)
//! - `GROUP BY`, `ORDER BY n [ASC|DESC], ...` (SELECT 위치, 1-based)
//!
//! ## 빠른 시작
//!
//! ```rust,no_run
//! use sqlmr_core::{EngineConfig, SqlEngine};
//!
//! # fn main() -> sqlmr_core::SqlmrResult<()> {
//! let engine = SqlEngine::new(EngineConfig::default().with_input_path("input"))?;
//!
//! engine.execute_query(
//!     "SELECT user.3, COUNT(user.1) FROM user GROUP BY user.3 ORDER BY 2 DESC",
//! )?;
//! println!("{}", engine.display_results()?);
//! # Ok(())
//! # }
//! ```
//!
//! ## 실행 파이프라인
//!
//! ```text
//! SQL 문자열 → SqlCompiler → Query (모든 태스크에서 재컴파일, 읽기 전용)
//!          → RowProcessor (조인 → WHERE → key/value) → shuffle
//!          → Aggregator → [ORDER BY: SortStage, 단일 리듀서] → part-r-*
//! ```
//!
//! ## 모듈 구조
//!
//! - [`sql`]: AST, 컴파일러, 검증기, 스테이지 연산자
//! - [`mapreduce`]: Mapper/Reducer/Emitter 경계와 로컬 실행기
//! - [`engine`]: 실행 계획, 드라이버, 결과 조회
//! - [`config`]: 엔진/잡 설정
//! - [`record`]: 한 줄 레코드
//! - [`testdata`]: 샘플 테이블 생성기

pub mod config;
pub mod engine;
pub mod error;
pub mod mapreduce;
pub mod record;
pub mod sql;
pub mod testdata;

// Logging utilities
pub mod logging;

// Re-export commonly used types
pub use config::{EngineConfig, JobConf};
pub use engine::{Plan, SqlEngine};
pub use error::{SqlmrError, SqlmrResult};
pub use record::Record;
pub use sql::{Query, SqlCompiler};

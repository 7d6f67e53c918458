//! 存储层模块
//!
//! 进程内数据存储与种子数据加载，重启后运行期数据全部丢失。

pub mod memory;
pub mod seed;

pub use memory::MemoryStore;

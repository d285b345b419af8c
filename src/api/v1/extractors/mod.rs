/*
 * Responsibility
 * - Handler 引数になる extractor 群
 * - Every rejection renders as the regular error envelope (AppError)
 */
pub mod caller;
pub mod id_list;
pub mod json;
pub mod path_id;

//! Query normalization, similarity and grouping

mod group;
mod normalize;
pub mod parse;
mod similarity;

pub use group::{get_query_group, GroupKey};
pub use normalize::{
    extract_structure, normalize_parameters, normalize_query, normalize_whitespace,
    NormalizedQuery, PLACEHOLDER,
};
pub use parse::{parse, parse_one, tokenize, Node, Statement, Token, TokenKind};
pub use similarity::{
    calculate_similarity, normalized_similarity, string_similarity, structure_similarity,
};

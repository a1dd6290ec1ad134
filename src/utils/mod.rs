//! Shared helpers for text, links and client addresses

mod ip;
mod link;
mod text;

pub use ip::{client_ip, is_private_ip, parse_ip};
pub use link::{combine_url, extract_links, resolve_root_url, sterilize_link};
pub use text::{
    ellipsize, generate_slug, get_post_abstract, is_valid_route_name, markdown_to_html, remove_tags,
    split_keywords,
};

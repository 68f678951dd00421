pub mod document;
pub mod document_line;
pub mod history;
pub mod item;
pub mod manufacturer;
pub mod nomenclature;
pub mod shelf;
pub mod warehouse;

/// Tree-sitter grammar selection for declaration files.
use std::path::Path;

use tree_sitter::Language;

/// Map a source path to its tree-sitter language.
/// `.tsx` files get the TSX grammar; everything else, `.d.ts`, `.d.mts` and
/// extensionless files included, parses as plain TypeScript.
pub fn language_for_path(path: &Path) -> Language {
    let ext = path.extension().and_then(|e| return e.to_str()).unwrap_or("");

    return match ext {
        "tsx" => tree_sitter_typescript::LANGUAGE_TSX.into(),
        _ => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
    };
}

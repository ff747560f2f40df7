//! Per-language node-kind vocabularies feeding the generic walker in
//! [`super::extractor`]. Six languages: the Rust-native plus a
//! dynamically-typed, a curly-brace-typed, and two further curly-brace
//! languages, enough to exercise every extraction algorithm in spec §4.B
//! without pulling in all eleven of the teacher's tree-sitter grammars.

use super::extractor::LanguageSpec;

pub const RUST: LanguageSpec = LanguageSpec {
    name: "rust",
    extensions: &["rs"],
    language: || tree_sitter_rust::LANGUAGE.into(),
    function_kinds: &["function_item"],
    method_kinds: &[],
    class_kinds: &["impl_item"],
    interface_kinds: &["trait_item"],
    struct_kinds: &["struct_item"],
    enum_kinds: &["enum_item"],
    import_kinds: &["use_declaration"],
    call_kinds: &["call_expression"],
    call_name_field: "function",
    name_field: "name",
    comment_kinds: &["line_comment", "block_comment"],
    async_keyword: "async",
};

pub const PYTHON: LanguageSpec = LanguageSpec {
    name: "python",
    extensions: &["py"],
    language: || tree_sitter_python::LANGUAGE.into(),
    function_kinds: &["function_definition"],
    method_kinds: &[],
    class_kinds: &["class_definition"],
    interface_kinds: &[],
    struct_kinds: &[],
    enum_kinds: &[],
    import_kinds: &["import_statement", "import_from_statement"],
    call_kinds: &["call"],
    call_name_field: "function",
    name_field: "name",
    comment_kinds: &["comment"],
    async_keyword: "async",
};

pub const JAVASCRIPT: LanguageSpec = LanguageSpec {
    name: "javascript",
    extensions: &["js", "jsx", "mjs"],
    language: || tree_sitter_javascript::LANGUAGE.into(),
    function_kinds: &["function_declaration", "function_expression", "arrow_function"],
    method_kinds: &["method_definition"],
    class_kinds: &["class_declaration"],
    interface_kinds: &[],
    struct_kinds: &[],
    enum_kinds: &[],
    import_kinds: &["import_statement"],
    call_kinds: &["call_expression"],
    call_name_field: "function",
    name_field: "name",
    comment_kinds: &["comment"],
    async_keyword: "async",
};

pub const TYPESCRIPT: LanguageSpec = LanguageSpec {
    name: "typescript",
    extensions: &["ts", "tsx"],
    language: || tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
    function_kinds: &["function_declaration", "function_expression", "arrow_function"],
    method_kinds: &["method_definition", "method_signature"],
    class_kinds: &["class_declaration"],
    interface_kinds: &["interface_declaration"],
    struct_kinds: &[],
    enum_kinds: &["enum_declaration"],
    import_kinds: &["import_statement"],
    call_kinds: &["call_expression"],
    call_name_field: "function",
    name_field: "name",
    comment_kinds: &["comment"],
    async_keyword: "async",
};

pub const GO: LanguageSpec = LanguageSpec {
    name: "go",
    extensions: &["go"],
    language: || tree_sitter_go::LANGUAGE.into(),
    function_kinds: &["function_declaration"],
    method_kinds: &["method_declaration"],
    class_kinds: &[],
    interface_kinds: &["interface_type"],
    struct_kinds: &["type_declaration"],
    enum_kinds: &[],
    import_kinds: &["import_declaration"],
    call_kinds: &["call_expression"],
    call_name_field: "function",
    name_field: "name",
    comment_kinds: &["comment"],
    async_keyword: "go",
};

pub const JAVA: LanguageSpec = LanguageSpec {
    name: "java",
    extensions: &["java"],
    language: || tree_sitter_java::LANGUAGE.into(),
    function_kinds: &[],
    method_kinds: &["method_declaration", "constructor_declaration"],
    class_kinds: &["class_declaration"],
    interface_kinds: &["interface_declaration"],
    struct_kinds: &[],
    enum_kinds: &["enum_declaration"],
    import_kinds: &["import_declaration"],
    call_kinds: &["method_invocation"],
    call_name_field: "name",
    name_field: "name",
    comment_kinds: &["line_comment", "block_comment"],
    async_keyword: "synchronized",
};

pub const ALL: &[&LanguageSpec] = &[&RUST, &PYTHON, &JAVASCRIPT, &TYPESCRIPT, &GO, &JAVA];

pub fn for_extension(extension: &str) -> Option<&'static LanguageSpec> {
    ALL.iter().copied().find(|spec| spec.extensions.contains(&extension))
}

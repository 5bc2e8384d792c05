use codevertex_ui::SelectOption;

/// 支援的語言，依伺服器順序。 / Supported languages in the order the service lists them.
pub const SUPPORTED_LANGUAGES: [&str; 25] = [
    "Python",
    "C++",
    "Java",
    "C",
    "C#",
    "JavaScript",
    "SQL",
    "Go",
    "Delphi/Object Pascal",
    "Visual Basic",
    "Fortran",
    "Rust",
    "PHP",
    "R",
    "MATLAB",
    "Assembly",
    "COBOL",
    "Ruby",
    "Swift",
    "Kotlin",
    "TypeScript",
    "Scala",
    "Perl",
    "Haskell",
    "Lua",
];

pub fn supported_languages() -> Vec<String> {
    SUPPORTED_LANGUAGES.iter().map(|name| name.to_string()).collect()
}

/// 不分大小寫搜尋；沒有結果時回傳完整清單。 / Case-insensitive search that falls back to the full list.
pub fn search_languages(query: &str) -> Vec<&'static str> {
    let needle = query.to_lowercase();
    let hits: Vec<&'static str> = SUPPORTED_LANGUAGES
        .iter()
        .copied()
        .filter(|name| name.to_lowercase().contains(&needle))
        .collect();
    if hits.is_empty() {
        SUPPORTED_LANGUAGES.to_vec()
    } else {
        hits
    }
}

pub fn language_options<S: AsRef<str>>(languages: &[S]) -> Vec<SelectOption> {
    languages
        .iter()
        .map(|name| SelectOption::plain(name.as_ref()))
        .collect()
}

/// 分頁使用的副檔名。 / File extension shown on editor tabs.
pub fn file_extension(language: Option<&str>) -> &'static str {
    match language {
        Some("Python") => "py",
        Some("JavaScript") => "js",
        Some("Java") => "java",
        Some("C++") => "cpp",
        Some("C") => "c",
        Some("C#") => "cs",
        Some("PHP") => "php",
        Some("Ruby") => "rb",
        Some("Go") => "go",
        Some("Rust") => "rs",
        Some("TypeScript") => "ts",
        Some("Swift") => "swift",
        Some("Kotlin") => "kt",
        _ => "txt",
    }
}

pub fn source_tab_name(language: Option<&str>) -> String {
    format!("main.{}", file_extension(language))
}

pub fn output_tab_name(language: Option<&str>) -> String {
    format!("output.{}", file_extension(language))
}

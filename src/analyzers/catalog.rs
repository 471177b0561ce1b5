//! Static knowledge the built-in analyzers match against.
//!
//! Lookups are keyed by lowercase strings.

use lazy_static::lazy_static;
use phf::{phf_map, phf_set};
use regex::Regex;

use crate::analysis::CommandCategory;

/// Code-block tag aliases mapped to canonical language names.
pub static TAG_LANGUAGES: phf::Map<&'static str, &'static str> = phf_map! {
    "js" => "JavaScript",
    "javascript" => "JavaScript",
    "jsx" => "JavaScript",
    "mjs" => "JavaScript",
    "cjs" => "JavaScript",
    "node" => "JavaScript",
    "nodejs" => "JavaScript",
    "ts" => "TypeScript",
    "typescript" => "TypeScript",
    "tsx" => "TypeScript",
    "py" => "Python",
    "python" => "Python",
    "python3" => "Python",
    "py3" => "Python",
    "pycon" => "Python",
    "ipython" => "Python",
    "rs" => "Rust",
    "rust" => "Rust",
    "go" => "Go",
    "golang" => "Go",
    "java" => "Java",
    "kt" => "Kotlin",
    "kotlin" => "Kotlin",
    "kts" => "Kotlin",
    "scala" => "Scala",
    "sbt" => "Scala",
    "c" => "C",
    "h" => "C",
    "cpp" => "C++",
    "c++" => "C++",
    "cc" => "C++",
    "cxx" => "C++",
    "hpp" => "C++",
    "cs" => "C#",
    "csharp" => "C#",
    "c#" => "C#",
    "fs" => "F#",
    "fsharp" => "F#",
    "rb" => "Ruby",
    "ruby" => "Ruby",
    "erb" => "Ruby",
    "php" => "PHP",
    "swift" => "Swift",
    "objc" => "Objective-C",
    "objective-c" => "Objective-C",
    "objectivec" => "Objective-C",
    "dart" => "Dart",
    "ex" => "Elixir",
    "exs" => "Elixir",
    "elixir" => "Elixir",
    "iex" => "Elixir",
    "erl" => "Erlang",
    "erlang" => "Erlang",
    "hs" => "Haskell",
    "haskell" => "Haskell",
    "lua" => "Lua",
    "pl" => "Perl",
    "perl" => "Perl",
    "r" => "R",
    "jl" => "Julia",
    "julia" => "Julia",
    "zig" => "Zig",
    "clj" => "Clojure",
    "clojure" => "Clojure",
    "cljs" => "Clojure",
    "ml" => "OCaml",
    "ocaml" => "OCaml",
};

/// Tags that are recognised but carry no programming-language context:
/// shells, data and markup formats.
pub static NEUTRAL_TAGS: phf::Set<&'static str> = phf_set! {
    "bash", "sh", "shell", "zsh", "fish", "console", "terminal", "shell-session",
    "shellsession", "powershell", "ps", "ps1", "pwsh", "cmd", "bat", "batch",
    "text", "txt", "plaintext", "plain", "none", "output",
    "json", "json5", "jsonc", "yaml", "yml", "toml", "ini", "cfg", "conf", "env", "dotenv",
    "properties", "xml", "html", "css", "scss", "sass", "less", "markdown", "md",
    "diff", "patch", "dockerfile", "docker", "makefile", "make", "cmake", "nginx",
    "sql", "graphql", "gql", "csv", "http", "mermaid", "tree", "hcl", "terraform",
    "proto", "protobuf", "requirements", "gemfile", "gomod",
};

/// Source file extensions mapped to languages.
pub static EXTENSION_LANGUAGES: phf::Map<&'static str, &'static str> = phf_map! {
    "js" => "JavaScript",
    "jsx" => "JavaScript",
    "mjs" => "JavaScript",
    "cjs" => "JavaScript",
    "ts" => "TypeScript",
    "tsx" => "TypeScript",
    "py" => "Python",
    "pyi" => "Python",
    "ipynb" => "Python",
    "rs" => "Rust",
    "go" => "Go",
    "java" => "Java",
    "kt" => "Kotlin",
    "kts" => "Kotlin",
    "scala" => "Scala",
    "c" => "C",
    "cpp" => "C++",
    "cc" => "C++",
    "cxx" => "C++",
    "hpp" => "C++",
    "cs" => "C#",
    "fs" => "F#",
    "rb" => "Ruby",
    "php" => "PHP",
    "swift" => "Swift",
    "m" => "Objective-C",
    "dart" => "Dart",
    "ex" => "Elixir",
    "exs" => "Elixir",
    "erl" => "Erlang",
    "hs" => "Haskell",
    "lua" => "Lua",
    "pl" => "Perl",
    "jl" => "Julia",
    "zig" => "Zig",
    "clj" => "Clojure",
    "ml" => "OCaml",
};

/// A package manifest or lock file.
#[derive(Debug, Clone, Copy)]
pub struct ManifestSpec {
    pub language: &'static str,
    pub manager: &'static str,
}

/// Well-known manifest file names (lowercase).
pub static MANIFESTS: phf::Map<&'static str, ManifestSpec> = phf_map! {
    "package.json" => ManifestSpec { language: "JavaScript", manager: "npm" },
    "package-lock.json" => ManifestSpec { language: "JavaScript", manager: "npm" },
    "yarn.lock" => ManifestSpec { language: "JavaScript", manager: "npm" },
    "pnpm-lock.yaml" => ManifestSpec { language: "JavaScript", manager: "npm" },
    "bun.lockb" => ManifestSpec { language: "JavaScript", manager: "npm" },
    "tsconfig.json" => ManifestSpec { language: "TypeScript", manager: "npm" },
    "requirements.txt" => ManifestSpec { language: "Python", manager: "pip" },
    "pyproject.toml" => ManifestSpec { language: "Python", manager: "pip" },
    "setup.py" => ManifestSpec { language: "Python", manager: "pip" },
    "setup.cfg" => ManifestSpec { language: "Python", manager: "pip" },
    "pipfile" => ManifestSpec { language: "Python", manager: "pip" },
    "pipfile.lock" => ManifestSpec { language: "Python", manager: "pip" },
    "poetry.lock" => ManifestSpec { language: "Python", manager: "pip" },
    "environment.yml" => ManifestSpec { language: "Python", manager: "conda" },
    "cargo.toml" => ManifestSpec { language: "Rust", manager: "cargo" },
    "cargo.lock" => ManifestSpec { language: "Rust", manager: "cargo" },
    "go.mod" => ManifestSpec { language: "Go", manager: "go" },
    "go.sum" => ManifestSpec { language: "Go", manager: "go" },
    "pom.xml" => ManifestSpec { language: "Java", manager: "maven" },
    "build.gradle" => ManifestSpec { language: "Java", manager: "gradle" },
    "build.gradle.kts" => ManifestSpec { language: "Kotlin", manager: "gradle" },
    "settings.gradle" => ManifestSpec { language: "Java", manager: "gradle" },
    "build.sbt" => ManifestSpec { language: "Scala", manager: "sbt" },
    "gemfile" => ManifestSpec { language: "Ruby", manager: "gem" },
    "gemfile.lock" => ManifestSpec { language: "Ruby", manager: "gem" },
    "composer.json" => ManifestSpec { language: "PHP", manager: "composer" },
    "composer.lock" => ManifestSpec { language: "PHP", manager: "composer" },
    "package.swift" => ManifestSpec { language: "Swift", manager: "swiftpm" },
    "podfile" => ManifestSpec { language: "Swift", manager: "cocoapods" },
    "pubspec.yaml" => ManifestSpec { language: "Dart", manager: "pub" },
    "mix.exs" => ManifestSpec { language: "Elixir", manager: "hex" },
    "rebar.config" => ManifestSpec { language: "Erlang", manager: "hex" },
    "stack.yaml" => ManifestSpec { language: "Haskell", manager: "cabal" },
    "cmakelists.txt" => ManifestSpec { language: "C++", manager: "cmake" },
    "conanfile.txt" => ManifestSpec { language: "C++", manager: "conan" },
    "vcpkg.json" => ManifestSpec { language: "C++", manager: "vcpkg" },
    "deno.json" => ManifestSpec { language: "TypeScript", manager: "deno" },
    "project.clj" => ManifestSpec { language: "Clojure", manager: "lein" },
    "deps.edn" => ManifestSpec { language: "Clojure", manager: "clojure" },
    "dune-project" => ManifestSpec { language: "OCaml", manager: "opam" },
};

/// Manifest name patterns that need globbing rather than exact lookup.
pub const MANIFEST_GLOBS: &[(&str, ManifestSpec)] = &[
    ("*.csproj", ManifestSpec { language: "C#", manager: "nuget" }),
    ("*.fsproj", ManifestSpec { language: "F#", manager: "nuget" }),
    ("*.sln", ManifestSpec { language: "C#", manager: "nuget" }),
    ("requirements-*.txt", ManifestSpec { language: "Python", manager: "pip" }),
    ("requirements/*.txt", ManifestSpec { language: "Python", manager: "pip" }),
    ("*.gemspec", ManifestSpec { language: "Ruby", manager: "gem" }),
    ("*.cabal", ManifestSpec { language: "Haskell", manager: "cabal" }),
    ("*.rockspec", ManifestSpec { language: "Lua", manager: "luarocks" }),
];

/// How a command-line executable is recognised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutableKind {
    /// Language-specific package manager; needs a subcommand.
    PackageManager,
    /// Any other well-known executable.
    Tool,
}

/// A known executable.
#[derive(Debug, Clone, Copy)]
pub struct ExecutableSpec {
    pub kind: ExecutableKind,
    /// Language the executable implies on its own.
    pub language: Option<&'static str>,
    /// Category when no subcommand keyword decides.
    pub default_category: CommandCategory,
    /// Whether the executable alone is a meaningful build/test invocation.
    pub bare: bool,
}

const fn pm(language: &'static str) -> ExecutableSpec {
    ExecutableSpec {
        kind: ExecutableKind::PackageManager,
        language: Some(language),
        default_category: CommandCategory::Other,
        bare: false,
    }
}

const fn tool(language: Option<&'static str>, default_category: CommandCategory) -> ExecutableSpec {
    ExecutableSpec {
        kind: ExecutableKind::Tool,
        language,
        default_category,
        bare: false,
    }
}

const fn bare(language: Option<&'static str>, default_category: CommandCategory) -> ExecutableSpec {
    ExecutableSpec {
        kind: ExecutableKind::Tool,
        language,
        default_category,
        bare: true,
    }
}

/// Known executables (lowercase).
pub static EXECUTABLES: phf::Map<&'static str, ExecutableSpec> = phf_map! {
    // Language package managers
    "npm" => pm("JavaScript"),
    "npx" => pm("JavaScript"),
    "yarn" => pm("JavaScript"),
    "pnpm" => pm("JavaScript"),
    "pnpx" => pm("JavaScript"),
    "bun" => pm("JavaScript"),
    "bunx" => pm("JavaScript"),
    "deno" => pm("TypeScript"),
    "pip" => pm("Python"),
    "pip3" => pm("Python"),
    "pipx" => pm("Python"),
    "poetry" => pm("Python"),
    "pipenv" => pm("Python"),
    "uv" => pm("Python"),
    "conda" => pm("Python"),
    "mamba" => pm("Python"),
    "cargo" => pm("Rust"),
    "rustup" => pm("Rust"),
    "go" => pm("Go"),
    "mvn" => pm("Java"),
    "./mvnw" => pm("Java"),
    "gradle" => pm("Java"),
    "./gradlew" => pm("Java"),
    "sbt" => pm("Scala"),
    "dotnet" => pm("C#"),
    "nuget" => pm("C#"),
    "gem" => pm("Ruby"),
    "bundle" => pm("Ruby"),
    "bundler" => pm("Ruby"),
    "composer" => pm("PHP"),
    "pod" => pm("Swift"),
    "flutter" => pm("Dart"),
    "dart" => pm("Dart"),
    "mix" => pm("Elixir"),
    "rebar3" => pm("Erlang"),
    "stack" => pm("Haskell"),
    "cabal" => pm("Haskell"),
    "luarocks" => pm("Lua"),
    "cpanm" => pm("Perl"),
    "lein" => pm("Clojure"),
    "opam" => pm("OCaml"),
    "dune" => pm("OCaml"),
    "zig" => pm("Zig"),
    "swift" => pm("Swift"),
    // Language runtimes and compilers
    "node" => tool(Some("JavaScript"), CommandCategory::Run),
    "ts-node" => tool(Some("TypeScript"), CommandCategory::Run),
    "tsx" => tool(Some("TypeScript"), CommandCategory::Run),
    "tsc" => tool(Some("TypeScript"), CommandCategory::Build),
    "python" => tool(Some("Python"), CommandCategory::Run),
    "python3" => tool(Some("Python"), CommandCategory::Run),
    "py" => tool(Some("Python"), CommandCategory::Run),
    "uvicorn" => tool(Some("Python"), CommandCategory::Run),
    "gunicorn" => tool(Some("Python"), CommandCategory::Run),
    "flask" => tool(Some("Python"), CommandCategory::Run),
    "rustc" => tool(Some("Rust"), CommandCategory::Build),
    "java" => tool(Some("Java"), CommandCategory::Run),
    "javac" => tool(Some("Java"), CommandCategory::Build),
    "kotlinc" => tool(Some("Kotlin"), CommandCategory::Build),
    "ruby" => tool(Some("Ruby"), CommandCategory::Run),
    "rails" => tool(Some("Ruby"), CommandCategory::Run),
    "php" => tool(Some("PHP"), CommandCategory::Run),
    "perl" => tool(Some("Perl"), CommandCategory::Run),
    "gcc" => tool(Some("C"), CommandCategory::Build),
    "clang" => tool(Some("C"), CommandCategory::Build),
    "g++" => tool(Some("C++"), CommandCategory::Build),
    "clang++" => tool(Some("C++"), CommandCategory::Build),
    "ghc" => tool(Some("Haskell"), CommandCategory::Build),
    "elixir" => tool(Some("Elixir"), CommandCategory::Run),
    "iex" => tool(Some("Elixir"), CommandCategory::Run),
    "julia" => tool(Some("Julia"), CommandCategory::Run),
    "rscript" => tool(Some("R"), CommandCategory::Run),
    "lua" => tool(Some("Lua"), CommandCategory::Run),
    // Test runners
    "pytest" => bare(Some("Python"), CommandCategory::Test),
    "tox" => bare(Some("Python"), CommandCategory::Test),
    "nox" => bare(Some("Python"), CommandCategory::Test),
    "jest" => bare(Some("JavaScript"), CommandCategory::Test),
    "vitest" => bare(Some("JavaScript"), CommandCategory::Test),
    "mocha" => bare(Some("JavaScript"), CommandCategory::Test),
    "rspec" => bare(Some("Ruby"), CommandCategory::Test),
    "phpunit" => bare(Some("PHP"), CommandCategory::Test),
    // Build systems
    "make" => bare(None, CommandCategory::Build),
    "cmake" => tool(None, CommandCategory::Build),
    "ninja" => bare(None, CommandCategory::Build),
    "meson" => tool(None, CommandCategory::Build),
    "bazel" => tool(None, CommandCategory::Build),
    "just" => bare(None, CommandCategory::Other),
    "task" => bare(None, CommandCategory::Other),
    "rake" => bare(Some("Ruby"), CommandCategory::Build),
    // Containers, infrastructure and hosting
    "docker" => tool(None, CommandCategory::Run),
    "docker-compose" => tool(None, CommandCategory::Run),
    "podman" => tool(None, CommandCategory::Run),
    "kubectl" => tool(None, CommandCategory::Deploy),
    "helm" => tool(None, CommandCategory::Deploy),
    "terraform" => tool(None, CommandCategory::Deploy),
    "ansible-playbook" => tool(None, CommandCategory::Deploy),
    "serverless" => tool(None, CommandCategory::Deploy),
    "vercel" => tool(None, CommandCategory::Deploy),
    "netlify" => tool(None, CommandCategory::Deploy),
    "heroku" => tool(None, CommandCategory::Deploy),
    "fly" => tool(None, CommandCategory::Deploy),
    "flyctl" => tool(None, CommandCategory::Deploy),
    "firebase" => tool(None, CommandCategory::Deploy),
    "wrangler" => tool(None, CommandCategory::Deploy),
    "gcloud" => tool(None, CommandCategory::Deploy),
    "aws" => tool(None, CommandCategory::Deploy),
    "az" => tool(None, CommandCategory::Deploy),
    // System package managers and general utilities
    "brew" => tool(None, CommandCategory::Install),
    "apt" => tool(None, CommandCategory::Install),
    "apt-get" => tool(None, CommandCategory::Install),
    "yum" => tool(None, CommandCategory::Install),
    "dnf" => tool(None, CommandCategory::Install),
    "pacman" => tool(None, CommandCategory::Install),
    "apk" => tool(None, CommandCategory::Install),
    "choco" => tool(None, CommandCategory::Install),
    "scoop" => tool(None, CommandCategory::Install),
    "winget" => tool(None, CommandCategory::Install),
    "snap" => tool(None, CommandCategory::Install),
    "git" => tool(None, CommandCategory::Other),
    "curl" => tool(None, CommandCategory::Other),
    "wget" => tool(None, CommandCategory::Other),
    "cd" => tool(None, CommandCategory::Other),
    "cp" => tool(None, CommandCategory::Other),
    "mkdir" => tool(None, CommandCategory::Other),
    "source" => tool(None, CommandCategory::Other),
    "chmod" => tool(None, CommandCategory::Other),
};

/// Subcommand keywords, checked in precedence order.
pub const CATEGORY_KEYWORDS: &[(CommandCategory, &[&str])] = &[
    (
        CommandCategory::Build,
        &["build", "compile", "assemble", "dist", "bundle", "package", "pack"],
    ),
    (
        CommandCategory::Test,
        &["test", "tests", "spec", "specs", "e2e", "coverage", "unittest", "check"],
    ),
    (
        CommandCategory::Deploy,
        &["deploy", "publish", "release", "upload", "apply", "rollout"],
    ),
    (
        CommandCategory::Install,
        &[
            "install", "i", "add", "ci", "get", "restore", "require", "download", "sync",
            "bootstrap", "setup", "clone",
        ],
    ),
    (
        CommandCategory::Run,
        &["run", "start", "serve", "server", "dev", "exec", "up", "watch", "develop", "runserver"],
    ),
];

/// `(executable, subcommand)` pairs that install a built artifact; these are
/// builds, not dependency installs.
pub const FORCED_BUILD: &[(&str, &str)] = &[("go", "install"), ("mvn", "install"), ("./mvnw", "install")];

/// Category for a subcommand keyword, if it is one.
pub fn keyword_category(word: &str) -> Option<CommandCategory> {
    CATEGORY_KEYWORDS
        .iter()
        .find(|(_, words)| words.contains(&word))
        .map(|(category, _)| *category)
}

/// A framework or major library.
#[derive(Debug, Clone, Copy)]
pub struct FrameworkSpec {
    pub name: &'static str,
    pub language: &'static str,
    /// Mutually exclusive family, e.g. full-stack web frameworks.
    pub group: Option<&'static str>,
    /// Package names as declared in manifests (lowercase).
    pub packages: &'static [&'static str],
    /// Regex for prose mentions; `None` when the name is too ambiguous.
    pub mention: Option<&'static str>,
}

pub const FRAMEWORKS: &[FrameworkSpec] = &[
    FrameworkSpec { name: "React", language: "JavaScript", group: Some("frontend-ui"), packages: &["react"], mention: Some(r"\bReact(\.js)?\b") },
    FrameworkSpec { name: "Vue", language: "JavaScript", group: Some("frontend-ui"), packages: &["vue"], mention: Some(r"\bVue(\.js)?\b") },
    FrameworkSpec { name: "Angular", language: "TypeScript", group: Some("frontend-ui"), packages: &["@angular/core"], mention: Some(r"\bAngular\b") },
    FrameworkSpec { name: "Svelte", language: "JavaScript", group: Some("frontend-ui"), packages: &["svelte"], mention: Some(r"\bSvelte\b") },
    FrameworkSpec { name: "Next.js", language: "JavaScript", group: Some("fullstack-web"), packages: &["next"], mention: Some(r"\bNext\.?js\b") },
    FrameworkSpec { name: "Nuxt", language: "JavaScript", group: Some("fullstack-web"), packages: &["nuxt"], mention: Some(r"\bNuxt(\.?js)?\b") },
    FrameworkSpec { name: "Remix", language: "JavaScript", group: Some("fullstack-web"), packages: &["@remix-run/react", "@remix-run/node"], mention: Some(r"\bRemix\b") },
    FrameworkSpec { name: "SvelteKit", language: "JavaScript", group: Some("fullstack-web"), packages: &["@sveltejs/kit"], mention: Some(r"\bSvelteKit\b") },
    FrameworkSpec { name: "Express", language: "JavaScript", group: Some("node-server"), packages: &["express"], mention: Some(r"\bExpress(\.js)?\b") },
    FrameworkSpec { name: "Fastify", language: "JavaScript", group: Some("node-server"), packages: &["fastify"], mention: Some(r"\bFastify\b") },
    FrameworkSpec { name: "NestJS", language: "TypeScript", group: Some("node-server"), packages: &["@nestjs/core"], mention: Some(r"\bNest\.?JS\b") },
    FrameworkSpec { name: "Electron", language: "JavaScript", group: None, packages: &["electron"], mention: Some(r"\bElectron\b") },
    FrameworkSpec { name: "Tailwind CSS", language: "JavaScript", group: None, packages: &["tailwindcss"], mention: Some(r"\bTailwind(\s?CSS)?\b") },
    FrameworkSpec { name: "Django", language: "Python", group: Some("python-web"), packages: &["django"], mention: Some(r"\bDjango\b") },
    FrameworkSpec { name: "Flask", language: "Python", group: Some("python-web"), packages: &["flask"], mention: Some(r"\bFlask\b") },
    FrameworkSpec { name: "FastAPI", language: "Python", group: Some("python-web"), packages: &["fastapi"], mention: Some(r"\bFastAPI\b") },
    FrameworkSpec { name: "PyTorch", language: "Python", group: None, packages: &["torch"], mention: Some(r"\bPyTorch\b") },
    FrameworkSpec { name: "TensorFlow", language: "Python", group: None, packages: &["tensorflow"], mention: Some(r"\bTensorFlow\b") },
    FrameworkSpec { name: "Ruby on Rails", language: "Ruby", group: Some("ruby-web"), packages: &["rails"], mention: Some(r"\b(Ruby on )?Rails\b") },
    FrameworkSpec { name: "Sinatra", language: "Ruby", group: Some("ruby-web"), packages: &["sinatra"], mention: Some(r"\bSinatra\b") },
    FrameworkSpec { name: "Laravel", language: "PHP", group: Some("php-web"), packages: &["laravel/framework"], mention: Some(r"\bLaravel\b") },
    FrameworkSpec { name: "Symfony", language: "PHP", group: Some("php-web"), packages: &["symfony/framework-bundle"], mention: Some(r"\bSymfony\b") },
    FrameworkSpec { name: "Spring Boot", language: "Java", group: Some("jvm-web"), packages: &["spring-boot-starter", "spring-boot-starter-web", "org.springframework.boot"], mention: Some(r"\bSpring Boot\b") },
    FrameworkSpec { name: "Actix Web", language: "Rust", group: Some("rust-web"), packages: &["actix-web"], mention: Some(r"\bActix(\s?Web)?\b") },
    FrameworkSpec { name: "Axum", language: "Rust", group: Some("rust-web"), packages: &["axum"], mention: Some(r"\bAxum\b") },
    FrameworkSpec { name: "Rocket", language: "Rust", group: Some("rust-web"), packages: &["rocket"], mention: None },
    FrameworkSpec { name: "Tokio", language: "Rust", group: None, packages: &["tokio"], mention: Some(r"\bTokio\b") },
    FrameworkSpec { name: "Gin", language: "Go", group: Some("go-web"), packages: &["github.com/gin-gonic/gin"], mention: None },
    FrameworkSpec { name: "Echo", language: "Go", group: Some("go-web"), packages: &["github.com/labstack/echo/v4", "github.com/labstack/echo"], mention: None },
    FrameworkSpec { name: "Fiber", language: "Go", group: Some("go-web"), packages: &["github.com/gofiber/fiber/v2"], mention: None },
    FrameworkSpec { name: "Phoenix", language: "Elixir", group: None, packages: &["phoenix"], mention: Some(r"\bPhoenix\b") },
    FrameworkSpec { name: "Flutter", language: "Dart", group: None, packages: &["flutter"], mention: Some(r"\bFlutter\b") },
    FrameworkSpec { name: "ASP.NET Core", language: "C#", group: None, packages: &["microsoft.aspnetcore.app"], mention: Some(r"\bASP\.NET( Core)?\b") },
];

/// Look up a framework by a declared package name.
pub fn framework_for_package(package: &str) -> Option<&'static FrameworkSpec> {
    let package = package.to_lowercase();
    FRAMEWORKS
        .iter()
        .find(|f| f.packages.iter().any(|p| *p == package))
}

pub fn framework_by_name(name: &str) -> Option<&'static FrameworkSpec> {
    FRAMEWORKS.iter().find(|f| f.name.eq_ignore_ascii_case(name))
}

/// Frameworks for a language, in catalog order.
pub fn frameworks_for_language(language: &str) -> impl Iterator<Item = &'static FrameworkSpec> + '_ {
    FRAMEWORKS.iter().filter(move |f| f.language == language)
}

/// Testing framework, tool or runner.
#[derive(Debug, Clone, Copy)]
pub struct TestingSpec {
    pub name: &'static str,
    pub language: Option<&'static str>,
    pub kind: TestingKind,
    /// Package names (lowercase).
    pub packages: &'static [&'static str],
    /// Command phrases that invoke it, matched on word boundaries in code.
    pub commands: &'static [&'static str],
    /// Config files that imply it (lowercase).
    pub config_files: &'static [&'static str],
    pub mention: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestingKind {
    Framework,
    Coverage,
    EndToEnd,
    Runner,
}

pub const TESTING: &[TestingSpec] = &[
    TestingSpec { name: "Jest", language: Some("JavaScript"), kind: TestingKind::Framework, packages: &["jest"], commands: &["jest"], config_files: &["jest.config.js", "jest.config.ts", "jest.config.mjs"], mention: r"\bJest\b" },
    TestingSpec { name: "Vitest", language: Some("JavaScript"), kind: TestingKind::Framework, packages: &["vitest"], commands: &["vitest"], config_files: &["vitest.config.ts", "vitest.config.js"], mention: r"\bVitest\b" },
    TestingSpec { name: "Mocha", language: Some("JavaScript"), kind: TestingKind::Framework, packages: &["mocha"], commands: &["mocha"], config_files: &[".mocharc.json", ".mocharc.yml", ".mocharc.js"], mention: r"\bMocha\b" },
    TestingSpec { name: "Jasmine", language: Some("JavaScript"), kind: TestingKind::Framework, packages: &["jasmine"], commands: &["jasmine"], config_files: &["jasmine.json"], mention: r"\bJasmine\b" },
    TestingSpec { name: "Karma", language: Some("JavaScript"), kind: TestingKind::Runner, packages: &["karma"], commands: &["karma start"], config_files: &["karma.conf.js"], mention: r"\bKarma\b" },
    TestingSpec { name: "pytest", language: Some("Python"), kind: TestingKind::Framework, packages: &["pytest"], commands: &["pytest", "py.test", "python -m pytest"], config_files: &["pytest.ini", "conftest.py"], mention: r"(?i)\bpytest\b" },
    TestingSpec { name: "unittest", language: Some("Python"), kind: TestingKind::Framework, packages: &[], commands: &["python -m unittest", "python3 -m unittest"], config_files: &[], mention: r"\bunittest\b" },
    TestingSpec { name: "tox", language: Some("Python"), kind: TestingKind::Runner, packages: &["tox"], commands: &["tox"], config_files: &["tox.ini"], mention: r"\btox\b" },
    TestingSpec { name: "nox", language: Some("Python"), kind: TestingKind::Runner, packages: &["nox"], commands: &["nox"], config_files: &["noxfile.py"], mention: r"\bnox\b" },
    TestingSpec { name: "RSpec", language: Some("Ruby"), kind: TestingKind::Framework, packages: &["rspec", "rspec-rails"], commands: &["rspec", "bundle exec rspec"], config_files: &[".rspec"], mention: r"\bRSpec\b" },
    TestingSpec { name: "Minitest", language: Some("Ruby"), kind: TestingKind::Framework, packages: &["minitest"], commands: &[], config_files: &[], mention: r"\bMinitest\b" },
    TestingSpec { name: "JUnit", language: Some("Java"), kind: TestingKind::Framework, packages: &["junit", "org.junit.jupiter"], commands: &[], config_files: &[], mention: r"\bJUnit\s?\d?\b" },
    TestingSpec { name: "TestNG", language: Some("Java"), kind: TestingKind::Framework, packages: &["testng"], commands: &[], config_files: &["testng.xml"], mention: r"\bTestNG\b" },
    TestingSpec { name: "PHPUnit", language: Some("PHP"), kind: TestingKind::Framework, packages: &["phpunit/phpunit"], commands: &["phpunit", "vendor/bin/phpunit"], config_files: &["phpunit.xml", "phpunit.xml.dist"], mention: r"\bPHPUnit\b" },
    TestingSpec { name: "cargo test", language: Some("Rust"), kind: TestingKind::Framework, packages: &[], commands: &["cargo test", "cargo nextest"], config_files: &[], mention: r"\bcargo (test|nextest)\b" },
    TestingSpec { name: "go test", language: Some("Go"), kind: TestingKind::Framework, packages: &[], commands: &["go test"], config_files: &[], mention: r"\bgo test\b" },
    TestingSpec { name: "xUnit", language: Some("C#"), kind: TestingKind::Framework, packages: &["xunit"], commands: &["dotnet test"], config_files: &[], mention: r"\bxUnit\b" },
    TestingSpec { name: "NUnit", language: Some("C#"), kind: TestingKind::Framework, packages: &["nunit"], commands: &[], config_files: &[], mention: r"\bNUnit\b" },
    TestingSpec { name: "ExUnit", language: Some("Elixir"), kind: TestingKind::Framework, packages: &[], commands: &["mix test"], config_files: &[], mention: r"\bExUnit\b" },
    TestingSpec { name: "XCTest", language: Some("Swift"), kind: TestingKind::Framework, packages: &[], commands: &["swift test", "xcodebuild test"], config_files: &[], mention: r"\bXCTest\b" },
    TestingSpec { name: "Cypress", language: Some("JavaScript"), kind: TestingKind::EndToEnd, packages: &["cypress"], commands: &["cypress run", "cypress open"], config_files: &["cypress.config.js", "cypress.config.ts", "cypress.json"], mention: r"\bCypress\b" },
    TestingSpec { name: "Playwright", language: Some("JavaScript"), kind: TestingKind::EndToEnd, packages: &["@playwright/test", "playwright"], commands: &["playwright test"], config_files: &["playwright.config.ts", "playwright.config.js"], mention: r"\bPlaywright\b" },
    TestingSpec { name: "Selenium", language: None, kind: TestingKind::EndToEnd, packages: &["selenium", "selenium-webdriver"], commands: &[], config_files: &[], mention: r"\bSelenium\b" },
    TestingSpec { name: "Puppeteer", language: Some("JavaScript"), kind: TestingKind::EndToEnd, packages: &["puppeteer"], commands: &[], config_files: &[], mention: r"\bPuppeteer\b" },
    TestingSpec { name: "Istanbul", language: Some("JavaScript"), kind: TestingKind::Coverage, packages: &["nyc", "istanbul"], commands: &["nyc"], config_files: &[".nycrc", ".nycrc.json"], mention: r"\b(Istanbul|nyc)\b" },
    TestingSpec { name: "coverage.py", language: Some("Python"), kind: TestingKind::Coverage, packages: &["coverage", "pytest-cov"], commands: &["coverage run", "pytest --cov"], config_files: &[".coveragerc"], mention: r"\bcoverage\.py\b|\bpytest-cov\b" },
    TestingSpec { name: "Tarpaulin", language: Some("Rust"), kind: TestingKind::Coverage, packages: &["cargo-tarpaulin"], commands: &["cargo tarpaulin"], config_files: &["tarpaulin.toml"], mention: r"(?i)\btarpaulin\b" },
    TestingSpec { name: "JaCoCo", language: Some("Java"), kind: TestingKind::Coverage, packages: &["jacoco"], commands: &[], config_files: &[], mention: r"\bJaCoCo\b" },
    TestingSpec { name: "SimpleCov", language: Some("Ruby"), kind: TestingKind::Coverage, packages: &["simplecov"], commands: &[], config_files: &[".simplecov"], mention: r"\bSimpleCov\b" },
    TestingSpec { name: "Codecov", language: None, kind: TestingKind::Coverage, packages: &[], commands: &[], config_files: &["codecov.yml", ".codecov.yml"], mention: r"\bCodecov\b|codecov\.io" },
    TestingSpec { name: "Coveralls", language: None, kind: TestingKind::Coverage, packages: &[], commands: &[], config_files: &[".coveralls.yml"], mention: r"\bCoveralls\b|coveralls\.io" },
];

lazy_static! {
    /// Prose patterns naming a language.
    pub static ref LANGUAGE_MENTIONS: Vec<(Regex, &'static str)> = vec![
        (Regex::new(r"\bJavaScript\b|\bNode(\.js|JS)\b").unwrap(), "JavaScript"),
        (Regex::new(r"\bTypeScript\b").unwrap(), "TypeScript"),
        (Regex::new(r"\bPython\s?3?\b").unwrap(), "Python"),
        (Regex::new(r"\bRust\b").unwrap(), "Rust"),
        (Regex::new(r"\bGolang\b|\bGo (module|modules|package|toolchain|\d+\.\d+)\b|\bwritten in Go\b").unwrap(), "Go"),
        (Regex::new(r"\bJava\b").unwrap(), "Java"),
        (Regex::new(r"\bKotlin\b").unwrap(), "Kotlin"),
        (Regex::new(r"\bScala\b").unwrap(), "Scala"),
        (Regex::new(r"\bC\+\+(\d\d)?").unwrap(), "C++"),
        (Regex::new(r"\bC#|\.NET\b").unwrap(), "C#"),
        (Regex::new(r"\bF#").unwrap(), "F#"),
        (Regex::new(r"\bANSI C\b|\bC99\b|\bC11\b|\bwritten in C\b").unwrap(), "C"),
        (Regex::new(r"\bRuby\b").unwrap(), "Ruby"),
        (Regex::new(r"\bPHP\b").unwrap(), "PHP"),
        (Regex::new(r"\bSwift\b").unwrap(), "Swift"),
        (Regex::new(r"\bObjective-C\b").unwrap(), "Objective-C"),
        (Regex::new(r"\bDart\b").unwrap(), "Dart"),
        (Regex::new(r"\bElixir\b").unwrap(), "Elixir"),
        (Regex::new(r"\bErlang\b").unwrap(), "Erlang"),
        (Regex::new(r"\bHaskell\b").unwrap(), "Haskell"),
        (Regex::new(r"\bLua\b").unwrap(), "Lua"),
        (Regex::new(r"\bPerl\b").unwrap(), "Perl"),
        (Regex::new(r"\bJulia\b").unwrap(), "Julia"),
        (Regex::new(r"\bZig\b").unwrap(), "Zig"),
        (Regex::new(r"\bClojure\b").unwrap(), "Clojure"),
        (Regex::new(r"\bOCaml\b").unwrap(), "OCaml"),
    ];

    /// Prose patterns naming a framework, indexed into `FRAMEWORKS`.
    pub static ref FRAMEWORK_MENTIONS: Vec<(Regex, usize)> = FRAMEWORKS
        .iter()
        .enumerate()
        .filter_map(|(i, f)| f.mention.map(|m| (Regex::new(m).unwrap(), i)))
        .collect();

    /// Prose patterns naming a testing tool, indexed into `TESTING`.
    pub static ref TESTING_MENTIONS: Vec<(Regex, usize)> = TESTING
        .iter()
        .enumerate()
        .map(|(i, t)| (Regex::new(t.mention).unwrap(), i))
        .collect();

    /// A file name with an extension, as written in prose or inline code.
    pub static ref FILE_NAME: Regex =
        Regex::new(r"(?:^|[\s`(\[/])((?:[\w.-]+/)*[\w-]+(?:\.[\w-]+)*\.([A-Za-z0-9]{1,6}))\b").unwrap();
}

/// Resolve a code-block tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagMatch {
    Language(&'static str),
    Neutral,
    Unknown,
}

pub fn resolve_tag(tag: &str) -> TagMatch {
    let tag = tag
        .trim()
        .trim_matches(|c| c == '{' || c == '}' || c == '.')
        .to_lowercase();
    if let Some(lang) = TAG_LANGUAGES.get(tag.as_str()) {
        TagMatch::Language(lang)
    } else if NEUTRAL_TAGS.contains(tag.as_str()) {
        TagMatch::Neutral
    } else {
        TagMatch::Unknown
    }
}

/// Language implied by a file name, via its extension or as a manifest.
pub fn language_for_file(file: &str) -> Option<&'static str> {
    let base = file.rsplit('/').next().unwrap_or(file).to_lowercase();
    if let Some(spec) = MANIFESTS.get(base.as_str()) {
        return Some(spec.language);
    }
    let ext = base.rsplit_once('.').map(|(_, e)| e)?;
    EXTENSION_LANGUAGES.get(ext).copied()
}

/// All known language names, sorted.
pub fn known_languages() -> Vec<&'static str> {
    let mut langs: Vec<&'static str> = TAG_LANGUAGES.values().copied().collect();
    langs.sort_unstable();
    langs.dedup();
    langs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_tag() {
        assert_eq!(resolve_tag("JS"), TagMatch::Language("JavaScript"));
        assert_eq!(resolve_tag("py"), TagMatch::Language("Python"));
        assert_eq!(resolve_tag("bash"), TagMatch::Neutral);
        assert_eq!(resolve_tag("{.rust}"), TagMatch::Language("Rust"));
        assert_eq!(resolve_tag("brainfuck"), TagMatch::Unknown);
    }

    #[test]
    fn test_language_for_file() {
        assert_eq!(language_for_file("src/main.rs"), Some("Rust"));
        assert_eq!(language_for_file("package.json"), Some("JavaScript"));
        assert_eq!(language_for_file("Cargo.toml"), Some("Rust"));
        assert_eq!(language_for_file("notes.txt"), None);
    }

    #[test]
    fn test_keyword_precedence() {
        assert_eq!(keyword_category("build"), Some(CommandCategory::Build));
        assert_eq!(keyword_category("install"), Some(CommandCategory::Install));
        assert_eq!(keyword_category("start"), Some(CommandCategory::Run));
        assert_eq!(keyword_category("express"), None);
    }

    #[test]
    fn test_framework_lookup() {
        assert_eq!(framework_for_package("React").map(|f| f.name), Some("React"));
        assert_eq!(framework_for_package("next").and_then(|f| f.group), Some("fullstack-web"));
        assert!(framework_by_name("django").is_some());
        assert!(frameworks_for_language("Python").any(|f| f.name == "Flask"));
    }

    #[test]
    fn test_mention_patterns_compile() {
        assert_eq!(FRAMEWORK_MENTIONS.len(), FRAMEWORKS.iter().filter(|f| f.mention.is_some()).count());
        assert_eq!(TESTING_MENTIONS.len(), TESTING.len());
        assert!(LANGUAGE_MENTIONS.iter().any(|(re, l)| *l == "Rust" && re.is_match("Written in Rust.")));
        assert!(!LANGUAGE_MENTIONS.iter().any(|(re, l)| *l == "Java" && re.is_match("JavaScript")));
    }

    #[test]
    fn test_known_languages_sorted() {
        let langs = known_languages();
        assert!(langs.contains(&"Rust"));
        assert!(langs.windows(2).all(|w| w[0] < w[1]));
    }
}

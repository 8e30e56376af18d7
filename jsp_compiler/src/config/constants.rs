pub mod compile_time {
    pub mod resources {
        /// Maximum size of a single template source (10MB)
        /// SECURITY: Prevents DoS via enormous template files
        pub const MAX_SOURCE_SIZE: u64 = 10 * 1024 * 1024;

        /// Root of the implicit tag-file directories
        pub const TAG_DIR_ROOT: &str = "/WEB-INF/tags";

        /// Root of tag files packaged inside a library archive
        pub const META_INF_TAG_DIR_ROOT: &str = "/META-INF/tags";

        /// Manifest read from an implicit tag directory
        pub const IMPLICIT_MANIFEST_NAME: &str = "implicit.toml";

        /// Tag plugin manifest location
        pub const TAG_PLUGINS_MANIFEST: &str = "/WEB-INF/tagPlugins.toml";

        /// Tag file suffix (standard syntax)
        pub const TAG_FILE_SUFFIX: &str = ".tag";

        /// Tag file suffix (XML syntax)
        pub const TAG_FILE_XML_SUFFIX: &str = ".tagx";

        /// Page suffixes picked up by batch discovery
        pub const PAGE_SUFFIXES: &[&str] = &[".jsp", ".jspx"];

        /// Suffixes selecting the XML syntax
        pub const XML_SYNTAX_SUFFIXES: &[&str] = &[".jspx", ".tagx"];
    }

    pub mod syntax {
        /// Maximum depth of nested include directives
        /// SECURITY: Prevents stack exhaustion through include chains
        pub const MAX_INCLUDE_DEPTH: usize = 64;

        /// Maximum nesting depth of actions and custom tags
        /// SECURITY: Prevents stack overflow in recursive descent
        pub const MAX_TAG_NESTING_DEPTH: usize = 256;

        /// URN prefix used to key implicit tag libraries
        pub const TAG_DIR_URN_PREFIX: &str = "urn:jsptagdir:";

        /// Prefix reserved for standard actions
        pub const JSP_PREFIX: &str = "jsp";

        /// Package for handlers generated from tag files under /WEB-INF/tags
        pub const TAG_FILE_PACKAGE_WEB: &str = "org.apache.jsp.tag.web";

        /// Package for handlers generated from tag files inside libraries
        pub const TAG_FILE_PACKAGE_META: &str = "org.apache.jsp.tag.meta";
    }

    pub mod page {
        /// Default output buffer size in kilobytes
        pub const DEFAULT_BUFFER_KB: usize = 8;

        /// Encoding used when nothing else is declared
        pub const DEFAULT_PAGE_ENCODING: &str = "ISO-8859-1";

        /// Encoding used by XML-syntax documents
        pub const DEFAULT_XML_ENCODING: &str = "UTF-8";

        /// Only scripting language accepted by the language attribute
        pub const SCRIPTING_LANGUAGE: &str = "java";

        /// Bytes sniffed when looking for a pageEncoding declaration
        pub const ENCODING_SNIFF_LIMIT: usize = 4096;
    }

    pub mod batch_processing {
        /// Maximum number of worker threads for page compilation
        /// RESOURCE: Controls system resource consumption
        pub const MAX_WORKER_THREADS: usize = 8;

        /// Maximum pages per batch
        /// SECURITY: Prevents DoS via batch size explosion
        pub const MAX_FILES_PER_BATCH: usize = 1000;

        /// Upper bound on pages handed to one worker
        pub const MAX_CHUNK_SIZE: usize = 50;
    }

    pub mod logging {
        /// Log buffer size for batch operations
        /// RESOURCE: Controls memory usage for logging
        pub const LOG_BUFFER_SIZE: usize = 10_000;

        /// Maximum log message length
        pub const MAX_LOG_MESSAGE_LENGTH: usize = 10_000;

        /// Maximum log events per file before truncation
        /// SECURITY: Prevents DoS via log event explosion
        pub const MAX_LOG_EVENTS_PER_FILE: usize = 1_000;
    }
}

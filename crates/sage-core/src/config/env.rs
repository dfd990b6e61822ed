use super::Config;

impl Config {
    pub(crate) fn apply_env_overrides(&mut self) {
        self.apply_env_overrides_models();
        self.apply_env_overrides_store();
        self.apply_env_overrides_mcp();
        self.apply_env_overrides_rag();
    }

    fn apply_env_overrides_models(&mut self) {
        if let Ok(v) = std::env::var("SAGE_LLM_BASE_URL") {
            self.llm.base_url = v;
        }
        if let Ok(v) = std::env::var("SAGE_LLM_MODEL") {
            self.llm.model = v;
        }
        if let Ok(v) = std::env::var("SAGE_LLM_MAX_TOKENS") {
            match v.parse::<u32>() {
                Ok(n) => self.llm.max_tokens = n,
                Err(_) => tracing::warn!("ignoring invalid SAGE_LLM_MAX_TOKENS value: {v}"),
            }
        }
        if let Ok(v) = std::env::var("SAGE_LLM_TEMPERATURE") {
            match v.parse::<f32>() {
                Ok(t) => self.llm.temperature = t,
                Err(_) => tracing::warn!("ignoring invalid SAGE_LLM_TEMPERATURE value: {v}"),
            }
        }
        if let Ok(v) = std::env::var("SAGE_EMBEDDING_PROVIDER") {
            if let Ok(kind) = serde_json::from_value(serde_json::Value::String(v.clone())) {
                self.embedding.provider = kind;
            } else {
                tracing::warn!("ignoring invalid SAGE_EMBEDDING_PROVIDER value: {v}");
            }
        }
        if let Ok(v) = std::env::var("SAGE_EMBEDDING_MODEL") {
            self.embedding.model = v;
        }
        if let Ok(v) = std::env::var("SAGE_EMBEDDING_DIMENSION") {
            match v.parse::<usize>() {
                Ok(d) => self.embedding.dimension = d,
                Err(_) => tracing::warn!("ignoring invalid SAGE_EMBEDDING_DIMENSION value: {v}"),
            }
        }
    }

    fn apply_env_overrides_store(&mut self) {
        if let Ok(v) = std::env::var("SAGE_STORE_BACKEND") {
            if let Ok(backend) = serde_json::from_value(serde_json::Value::String(v.clone())) {
                self.store.backend = backend;
            } else {
                tracing::warn!("ignoring invalid SAGE_STORE_BACKEND value: {v}");
            }
        }
        if let Ok(v) = std::env::var("SAGE_QDRANT_URL") {
            self.store.qdrant_url = v;
        }
        if let Ok(v) = std::env::var("SAGE_KNOWLEDGE_COLLECTION") {
            self.store.knowledge_collection = v;
        }
        if let Ok(v) = std::env::var("SAGE_FAQ_COLLECTION") {
            self.store.faq_collection = v;
        }
        if let Ok(v) = std::env::var("SAGE_SCORE_THRESHOLD")
            && let Ok(t) = v.parse::<f32>()
        {
            self.store.score_threshold = Some(t);
        }
    }

    fn apply_env_overrides_mcp(&mut self) {
        if let Ok(v) = std::env::var("SAGE_MCP_TRANSPORT") {
            if let Ok(kind) = serde_json::from_value(serde_json::Value::String(v.clone())) {
                self.mcp.transport = kind;
            } else {
                tracing::warn!("ignoring invalid SAGE_MCP_TRANSPORT value: {v}");
            }
        }
        if let Ok(v) = std::env::var("SAGE_MCP_COMMAND") {
            self.mcp.command = v;
        }
        if let Ok(v) = std::env::var("SAGE_MCP_URL") {
            self.mcp.url = v;
        }
        if let Ok(v) = std::env::var("SAGE_MCP_CONNECT_ATTEMPTS")
            && let Ok(n) = v.parse::<u32>()
        {
            self.mcp.connect_attempts = n;
        }
        if let Ok(v) = std::env::var("SAGE_MCP_RETRY_DELAY_MS")
            && let Ok(ms) = v.parse::<u64>()
        {
            self.mcp.retry_delay_ms = ms;
        }
        if let Ok(v) = std::env::var("SAGE_MCP_TIMEOUT")
            && let Ok(secs) = v.parse::<u64>()
        {
            self.mcp.timeout_secs = secs;
        }
        if let Ok(v) = std::env::var("SAGE_SERVER_HOST") {
            self.server.host = v;
        }
        if let Ok(v) = std::env::var("SAGE_SERVER_PORT")
            && let Ok(port) = v.parse::<u16>()
        {
            self.server.port = port;
        }
    }

    fn apply_env_overrides_rag(&mut self) {
        if let Ok(v) = std::env::var("SAGE_RAG_CHUNK_SIZE")
            && let Ok(n) = v.parse::<usize>()
        {
            self.rag.chunk_size = n;
        }
        if let Ok(v) = std::env::var("SAGE_RAG_CHUNK_OVERLAP")
            && let Ok(n) = v.parse::<usize>()
        {
            self.rag.chunk_overlap = n;
        }
        if let Ok(v) = std::env::var("SAGE_RAG_MAX_SEARCH_RESULTS")
            && let Ok(n) = v.parse::<usize>()
        {
            self.rag.max_search_results = n;
        }
        if let Ok(v) = std::env::var("SAGE_RAG_MAX_CONTEXT_ITEMS")
            && let Ok(n) = v.parse::<usize>()
        {
            self.rag.max_context_items = n;
        }
    }
}

//! Merges module OpenAPI fragments into one document.

use bookshelf_kernel::ModuleRegistry;
use serde_json::{json, Value};

/// Join a module mount with a path relative to it. `/` maps to the mount itself.
pub fn mount_path(module_name: &str, path: &str) -> String {
    match path {
        "" | "/" => format!("/{}", module_name),
        p if p.starts_with('/') => format!("/{}{}", module_name, p),
        p => format!("/{}/{}", module_name, p),
    }
}

/// Build the full OpenAPI document served at `/docs/openapi.json`.
pub fn merged_spec(registry: &ModuleRegistry) -> Value {
    let mut spec = json!({
        "openapi": "3.1.0",
        "info": {
            "title": "Bookshelf API",
            "version": env!("CARGO_PKG_VERSION"),
            "description": "Book catalogue keyed by ISBN"
        },
        "paths": {},
        "components": {
            "schemas": {}
        }
    });

    spec["components"]["schemas"]["ErrorResponse"] = json!({
        "type": "object",
        "properties": {
            "error": {
                "type": "object",
                "properties": {
                    "code": { "type": "string" },
                    "message": { "type": "string" },
                    "details": { "type": "array", "items": {} },
                    "trace_id": { "type": "string" },
                    "timestamp": { "type": "string" }
                },
                "required": ["code", "message", "trace_id", "timestamp"]
            }
        },
        "required": ["error"]
    });

    spec["paths"]["/healthz"] = json!({
        "get": {
            "summary": "Health check",
            "responses": {
                "200": {
                    "description": "OK",
                    "content": { "text/plain": { "schema": { "type": "string" } } }
                }
            }
        }
    });

    for module in registry.modules() {
        let Some(fragment) = module.openapi() else {
            continue;
        };

        if let Some(paths) = fragment.get("paths").and_then(Value::as_object) {
            for (path, item) in paths {
                spec["paths"][mount_path(module.name(), path)] = item.clone();
            }
        }

        if let Some(schemas) = fragment
            .get("components")
            .and_then(|c| c.get("schemas"))
            .and_then(Value::as_object)
        {
            for (name, schema) in schemas {
                spec["components"]["schemas"][name] = schema.clone();
            }
        }

        if let Some(tags) = fragment.get("tags").and_then(Value::as_array) {
            let merged = spec
                .as_object_mut()
                .and_then(|root| {
                    root.entry("tags")
                        .or_insert_with(|| Value::Array(Vec::new()))
                        .as_array_mut()
                });
            if let Some(merged) = merged {
                merged.extend(tags.iter().cloned());
            }
        }
    }

    spec
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bookshelf_kernel::Module;
    use std::sync::Arc;

    struct ShelfModule;

    #[async_trait]
    impl Module for ShelfModule {
        fn name(&self) -> &'static str {
            "shelves"
        }

        fn openapi(&self) -> Option<Value> {
            Some(json!({
                "paths": {
                    "/": { "get": { "summary": "List shelves" } },
                    "/{id}": { "get": { "summary": "Get shelf" } }
                },
                "components": { "schemas": { "Shelf": { "type": "object" } } },
                "tags": [{ "name": "Shelves" }]
            }))
        }
    }

    #[test]
    fn mount_path_handles_root_and_nested() {
        assert_eq!(mount_path("books", "/"), "/books");
        assert_eq!(mount_path("books", "/{isbn}"), "/books/{isbn}");
        assert_eq!(mount_path("books", "health"), "/books/health");
    }

    #[test]
    fn module_fragments_are_prefixed_and_merged() {
        let mut registry = ModuleRegistry::new();
        registry.register(Arc::new(ShelfModule)).unwrap();

        let spec = merged_spec(&registry);
        assert_eq!(spec["paths"]["/shelves"]["get"]["summary"], "List shelves");
        assert_eq!(spec["paths"]["/shelves/{id}"]["get"]["summary"], "Get shelf");
        assert!(spec["paths"]["/healthz"].is_object());
        assert!(spec["components"]["schemas"]["Shelf"].is_object());
        assert!(spec["components"]["schemas"]["ErrorResponse"].is_object());
        assert_eq!(spec["tags"][0]["name"], "Shelves");
    }
}

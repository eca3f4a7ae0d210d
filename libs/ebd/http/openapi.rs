//! OpenAPI document served at `/apispec.json`

use serde_json::{json, Map, Value};

fn schema_ref(name: &str) -> Value {
    json!({ "$ref": format!("#/components/schemas/{}", name) })
}

fn json_body(schema: Value) -> Value {
    json!({ "content": { "application/json": { "schema": schema } } })
}

fn response(description: &str, schema: Option<Value>) -> Value {
    match schema {
        Some(schema) => {
            let mut body = json_body(schema);
            body["description"] = json!(description);
            body
        }
        None => json!({ "description": description }),
    }
}

fn list_of(name: &str) -> Value {
    json!({ "type": "array", "items": schema_ref(name) })
}

fn id_param() -> Value {
    json!({
        "name": "id",
        "in": "path",
        "required": true,
        "schema": { "type": "integer" }
    })
}

fn query_param(name: &str, description: &str) -> Value {
    json!({
        "name": name,
        "in": "query",
        "required": true,
        "description": description,
        "schema": { "type": "string" }
    })
}

/// CRUD paths for one resource: `GET`/`POST` on the collection and
/// `PUT`/`DELETE` on `/{id}`
fn crud_paths(paths: &mut Map<String, Value>, base: &str, tag: &str, schema: &str, input: &str) {
    paths.insert(
        base.to_string(),
        json!({
            "get": {
                "tags": [tag],
                "security": [{ "bearerAuth": [] }],
                "responses": { "200": response("Lista", Some(list_of(schema))) }
            },
            "post": {
                "tags": [tag],
                "security": [{ "bearerAuth": [] }],
                "requestBody": json_body(schema_ref(input)),
                "responses": {
                    "201": response("Criado", Some(schema_ref(schema))),
                    "400": response("Dados inválidos", Some(schema_ref("Message")))
                }
            }
        }),
    );
    paths.insert(
        format!("{}/{{id}}", base),
        json!({
            "put": {
                "tags": [tag],
                "security": [{ "bearerAuth": [] }],
                "parameters": [id_param()],
                "requestBody": json_body(schema_ref(input)),
                "responses": {
                    "200": response("Atualizado", Some(schema_ref(schema))),
                    "404": response("Não encontrado", Some(schema_ref("Message")))
                }
            },
            "delete": {
                "tags": [tag],
                "security": [{ "bearerAuth": [] }],
                "parameters": [id_param()],
                "responses": {
                    "200": response("Removido", Some(schema_ref("Message"))),
                    "404": response("Não encontrado", Some(schema_ref("Message")))
                }
            }
        }),
    );
}

fn schemas() -> Value {
    json!({
        "Message": {
            "type": "object",
            "properties": {
                "msg": { "type": "string" },
                "error": { "type": "string" }
            }
        },
        "Credentials": {
            "type": "object",
            "required": ["username", "password"],
            "properties": {
                "username": { "type": "string" },
                "password": { "type": "string" }
            }
        },
        "User": {
            "type": "object",
            "properties": {
                "id": { "type": "integer" },
                "username": { "type": "string" }
            }
        },
        "Classe": {
            "type": "object",
            "properties": {
                "id": { "type": "integer" },
                "nome": { "type": "string" },
                "professor": { "type": "string" }
            }
        },
        "ClasseInput": {
            "type": "object",
            "properties": {
                "nome": { "type": "string" },
                "professor": { "type": "string" }
            }
        },
        "Aluno": {
            "type": "object",
            "properties": {
                "id": { "type": "integer" },
                "nome": { "type": "string" },
                "data_nascimento": { "type": "string", "format": "date" },
                "status": { "type": "string", "enum": ["MATRICULADO", "DESMATRICULADO"] },
                "classe_id": { "type": "integer" }
            }
        },
        "AlunoInput": {
            "type": "object",
            "properties": {
                "nome": { "type": "string" },
                "data_nascimento": { "type": "string", "format": "date" },
                "status": { "type": "string", "enum": ["MATRICULADO", "DESMATRICULADO"] },
                "classe_id": { "type": "integer" }
            }
        },
        "Frequencia": {
            "type": "object",
            "properties": {
                "id": { "type": "integer" },
                "classe_id": { "type": "integer" },
                "data": { "type": "string", "format": "date" },
                "total_biblia": { "type": "integer" },
                "total_present": { "type": "integer" },
                "total_absent": { "type": "integer" },
                "total_visitors": { "type": "integer" },
                "total_general": { "type": "integer" },
                "presencas": { "type": "array", "items": { "type": "object" } }
            }
        },
        "FrequenciaInput": {
            "type": "object",
            "properties": {
                "classe_id": { "type": "integer" },
                "data": { "type": "string", "format": "date" },
                "total_biblia": { "type": "integer" },
                "total_present": { "type": "integer" },
                "total_absent": { "type": "integer" },
                "total_visitors": { "type": "integer" },
                "total_general": { "type": "integer" },
                "presencas": { "type": "array", "items": { "type": "object" } }
            }
        },
        "Historico": {
            "allOf": [
                { "$ref": "#/components/schemas/Frequencia" },
                {
                    "type": "object",
                    "properties": { "presenca": { "type": "object" } }
                }
            ]
        }
    })
}

pub fn document() -> Value {
    let mut paths = Map::new();

    paths.insert(
        "/register".to_string(),
        json!({
            "post": {
                "tags": ["auth"],
                "requestBody": json_body(schema_ref("Credentials")),
                "responses": {
                    "201": response("Usuário registrado", Some(schema_ref("User"))),
                    "400": response("Dados inválidos", Some(schema_ref("Message")))
                }
            }
        }),
    );
    paths.insert(
        "/login".to_string(),
        json!({
            "post": {
                "tags": ["auth"],
                "requestBody": json_body(schema_ref("Credentials")),
                "responses": {
                    "200": response("Token de acesso", Some(json!({
                        "type": "object",
                        "properties": { "access_token": { "type": "string" } }
                    }))),
                    "401": response("Credenciais inválidas", Some(schema_ref("Message")))
                }
            }
        }),
    );
    paths.insert(
        "/protected".to_string(),
        json!({
            "get": {
                "tags": ["auth"],
                "security": [{ "bearerAuth": [] }],
                "responses": { "200": response("Usuário logado", Some(schema_ref("Message"))) }
            }
        }),
    );

    crud_paths(&mut paths, "/classes", "classes", "Classe", "ClasseInput");
    crud_paths(&mut paths, "/alunos", "alunos", "Aluno", "AlunoInput");
    crud_paths(&mut paths, "/frequencias", "frequencias", "Frequencia", "FrequenciaInput");

    paths.insert(
        "/alunos/{id}/historico".to_string(),
        json!({
            "get": {
                "tags": ["alunos"],
                "security": [{ "bearerAuth": [] }],
                "parameters": [id_param()],
                "responses": { "200": response("Histórico de frequência", Some(list_of("Historico"))) }
            }
        }),
    );
    paths.insert(
        "/aniversariantes".to_string(),
        json!({
            "get": {
                "tags": ["alunos"],
                "security": [{ "bearerAuth": [] }],
                "responses": { "200": response("Aniversariantes do dia", Some(list_of("Aluno"))) }
            }
        }),
    );
    paths.insert(
        "/relatorios/semanal".to_string(),
        json!({
            "get": {
                "tags": ["relatorios"],
                "security": [{ "bearerAuth": [] }],
                "parameters": [
                    query_param("data_inicio", "YYYY-MM-DD"),
                    query_param("data_fim", "YYYY-MM-DD")
                ],
                "responses": {
                    "200": response("Frequências no período", Some(list_of("Frequencia"))),
                    "400": response("Formato de data inválido", Some(schema_ref("Message")))
                }
            }
        }),
    );
    paths.insert(
        "/relatorios/mensal".to_string(),
        json!({
            "get": {
                "tags": ["relatorios"],
                "security": [{ "bearerAuth": [] }],
                "parameters": [
                    query_param("mes", "1-12"),
                    query_param("ano", "Ano com quatro dígitos")
                ],
                "responses": {
                    "200": response("Frequências do mês", Some(list_of("Frequencia"))),
                    "400": response("Parâmetros inválidos", Some(schema_ref("Message")))
                }
            }
        }),
    );
    paths.insert(
        "/health".to_string(),
        json!({
            "get": {
                "tags": ["sistema"],
                "responses": {
                    "200": response("Banco de dados disponível", None),
                    "503": response("Banco de dados indisponível", None)
                }
            }
        }),
    );

    json!({
        "openapi": "3.0.3",
        "info": {
            "title": "Sistema de Gestão da EBD",
            "version": env!("CARGO_PKG_VERSION")
        },
        "paths": paths,
        "components": {
            "securitySchemes": {
                "bearerAuth": { "type": "http", "scheme": "bearer", "bearerFormat": "JWT" }
            },
            "schemas": schemas()
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_every_route() {
        let doc = document();
        let paths = doc["paths"].as_object().unwrap();
        for path in [
            "/register",
            "/login",
            "/protected",
            "/classes",
            "/classes/{id}",
            "/alunos",
            "/alunos/{id}",
            "/alunos/{id}/historico",
            "/aniversariantes",
            "/frequencias",
            "/frequencias/{id}",
            "/relatorios/semanal",
            "/relatorios/mensal",
            "/health",
        ] {
            assert!(paths.contains_key(path), "missing {}", path);
        }
        assert!(paths["/classes/{id}"]["delete"].is_object());
    }

    #[test]
    fn test_every_schema_reference_resolves() {
        let doc = document();
        let schemas = doc["components"]["schemas"].as_object().unwrap();

        fn collect(value: &Value, refs: &mut Vec<String>) {
            match value {
                Value::Object(map) => {
                    if let Some(Value::String(r)) = map.get("$ref") {
                        refs.push(r.clone());
                    }
                    map.values().for_each(|v| collect(v, refs));
                }
                Value::Array(items) => items.iter().for_each(|v| collect(v, refs)),
                _ => {}
            }
        }

        let mut refs = Vec::new();
        collect(&doc, &mut refs);
        assert!(!refs.is_empty());
        for r in refs {
            let name = r.trim_start_matches("#/components/schemas/");
            assert!(schemas.contains_key(name), "dangling {}", r);
        }
    }
}

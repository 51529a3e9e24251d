use mockito::{Matcher, Mock, Server, ServerGuard};

use super::harness::{TestContext, TestEnv};

pub struct Scenario {
    pub name: &'static str,
    pub run: fn(&TestContext) -> Result<(), String>,
}

pub fn scenarios() -> Vec<Scenario> {
    vec![
        Scenario {
            name: "help_output",
            run: scenario_help,
        },
        Scenario {
            name: "missing_token",
            run: scenario_missing_token,
        },
        Scenario {
            name: "blank_token",
            run: scenario_blank_token,
        },
        Scenario {
            name: "missing_mode",
            run: scenario_missing_mode,
        },
        Scenario {
            name: "conflicting_modes",
            run: scenario_conflicting_modes,
        },
        Scenario {
            name: "conflicting_tokens",
            run: scenario_conflicting_tokens,
        },
        Scenario {
            name: "invalid_output_format",
            run: scenario_invalid_output_format,
        },
        Scenario {
            name: "invalid_config",
            run: scenario_invalid_config,
        },
        Scenario {
            name: "owner_scan_flags_missing_package",
            run: scenario_owner_scan,
        },
        Scenario {
            name: "owner_scan_text_output",
            run: scenario_owner_scan_text,
        },
        Scenario {
            name: "consolidated_dev_finding",
            run: scenario_consolidated_dev_finding,
        },
        Scenario {
            name: "language_search_star_range",
            run: scenario_language_search,
        },
        Scenario {
            name: "unreachable_forge_yields_empty_report",
            run: scenario_unreachable_forge,
        },
    ]
}

/// `flask==2.0.0\nnonexistent-pkg-xyz==1.0\n`
const REQUIREMENTS_B64: &str = "Zmxhc2s9PTIuMC4wCm5vbmV4aXN0ZW50LXBrZy14eXo9PTEuMAo=";

/// `{"dependencies":{"left-pad":"1.0.0"},"devDependencies":{"typosquat-lodash":"1.0.0"}}`
const PACKAGE_JSON_B64: &str = "eyJkZXBlbmRlbmNpZXMiOnsibGVmdC1wYWQiOiIxLjAuMCJ9LCJkZXZEZXBlbmRlbmNpZXMiOnsidHlwb3NxdWF0LWxvZGFzaCI6IjEuMC4wIn19";

const MANIFESTS: [&str; 4] = ["requirements.txt", "setup.py", "pyproject.toml", "package.json"];

/// Point every endpoint the binary talks to at `server`
fn use_mock_endpoints(env: &TestEnv, server: &ServerGuard) -> Result<(), String> {
    let url = server.url();
    env.write_config(&format!(
        r#"{{
            "github_api_url": "{url}",
            "pypi_url": "{url}",
            "npm_url": "{url}",
            "registry_timeout_secs": 5,
            "forge_timeout_secs": 5,
            "rate_limit": {{ "max_retries": 0, "max_total_wait_secs": 0 }}
        }}"#
    ))
}

fn mock_json(server: &mut ServerGuard, path: &str, status: usize, body: &str) -> Mock {
    server
        .mock("GET", path)
        .with_status(status)
        .with_header("content-type", "application/json")
        .with_body(body)
        .create()
}

/// One repository `acme/api` owned by `acme`, holding a single manifest
fn mock_owner_repo(server: &mut ServerGuard, manifest: &str, content_b64: &str) -> Vec<Mock> {
    let mut mocks = vec![
        server
            .mock("GET", "/users/acme/repos")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"[{"full_name":"acme/api","html_url":"https://github.com/acme/api","stargazers_count":12,"default_branch":"main"}]"#,
            )
            .create(),
    ];

    for name in MANIFESTS {
        let path = format!("/repos/acme/api/contents/{}", name);
        let mock = if name == manifest {
            let body = format!(r#"{{"encoding":"base64","content":"{}"}}"#, content_b64);
            mock_json(server, &path, 200, &body)
        } else {
            mock_json(server, &path, 404, r#"{"message":"Not Found"}"#)
        };
        mocks.push(mock);
    }
    mocks
}

fn mock_pypi(server: &mut ServerGuard) -> Vec<Mock> {
    vec![
        mock_json(server, "/pypi/flask/json", 200, r#"{"info":{"name":"flask"}}"#),
        mock_json(server, "/pypi/nonexistent-pkg-xyz/json", 404, r#"{"message":"Not Found"}"#),
    ]
}

fn scenario_help(ctx: &TestContext) -> Result<(), String> {
    let env = ctx.create_env("help")?;
    let output = ctx.run_depscout(&env, &["--help"])?;
    output.assert_success()?;
    output.assert_stdout_contains("--github-token")?;
    output.assert_stdout_contains("--language")?;
    output.assert_stdout_contains("--output-format")?;
    Ok(())
}

fn scenario_missing_token(ctx: &TestContext) -> Result<(), String> {
    let env = ctx.create_env("missing-token")?;
    let output = ctx.run_depscout(&env, &["--owner", "acme"])?;
    output.assert_exit_code(1)?;
    output.assert_stderr_contains("Either --github-token or --gitlab-token must be provided")?;
    Ok(())
}

fn scenario_blank_token(ctx: &TestContext) -> Result<(), String> {
    let env = ctx.create_env("blank-token")?;
    let output = ctx.run_depscout(&env, &["--github-token", "  ", "--owner", "acme"])?;
    output.assert_exit_code(1)?;
    output.assert_stderr_contains("--github-token")?;
    Ok(())
}

fn scenario_missing_mode(ctx: &TestContext) -> Result<(), String> {
    let env = ctx.create_env("missing-mode")?;
    let output = ctx.run_depscout(&env, &["--github-token", "t0ken"])?;
    output.assert_exit_code(1)?;
    output.assert_stderr_contains("Either --owner or --language must be specified")?;
    Ok(())
}

fn scenario_conflicting_modes(ctx: &TestContext) -> Result<(), String> {
    let env = ctx.create_env("conflicting-modes")?;
    let output = ctx.run_depscout(
        &env,
        &["--github-token", "t0ken", "--owner", "acme", "--language", "python"],
    )?;
    output.assert_failure()?;
    output.assert_stderr_contains("cannot be used with")?;
    Ok(())
}

fn scenario_conflicting_tokens(ctx: &TestContext) -> Result<(), String> {
    let env = ctx.create_env("conflicting-tokens")?;
    let output = ctx.run_depscout(
        &env,
        &["--github-token", "a", "--gitlab-token", "b", "--owner", "acme"],
    )?;
    output.assert_failure()?;
    output.assert_stderr_contains("cannot be used with")?;
    Ok(())
}

fn scenario_invalid_output_format(ctx: &TestContext) -> Result<(), String> {
    let env = ctx.create_env("invalid-format")?;
    let output = ctx.run_depscout(
        &env,
        &["--github-token", "t0ken", "--owner", "acme", "--output-format", "xml"],
    )?;
    output.assert_failure()?;
    output.assert_stderr_contains("invalid value")?;
    Ok(())
}

fn scenario_invalid_config(ctx: &TestContext) -> Result<(), String> {
    let env = ctx.create_env("invalid-config")?;
    env.write_config("{ not json")?;
    let output = ctx.run_depscout(&env, &["--github-token", "t0ken", "--owner", "acme"])?;
    output.assert_exit_code(1)?;
    output.assert_stderr_contains("Failed to parse config file")?;
    Ok(())
}

fn scenario_owner_scan(ctx: &TestContext) -> Result<(), String> {
    let env = ctx.create_env("owner-scan")?;
    let mut server = Server::new();
    use_mock_endpoints(&env, &server)?;
    let _forge = mock_owner_repo(&mut server, "requirements.txt", REQUIREMENTS_B64);
    let _pypi = mock_pypi(&mut server);

    let output = ctx.run_depscout(&env, &["--github-token", "t0ken", "--owner", "acme"])?;
    output.assert_success()?;
    output.assert_stderr_contains("Suspicious python package found: nonexistent-pkg-xyz")?;

    let json = output.report()?;
    let results = json.as_array().ok_or("Expected a JSON array")?;
    if results.len() != 1 {
        return Err(format!("Expected 1 result, got {}", results.len()));
    }
    let result = &results[0];
    if result["repository"] != "acme/api" || result["stars"] != 12 {
        return Err(format!("Unexpected repository fields: {}", result));
    }
    if result["python_dependencies"].as_array().map(Vec::len) != Some(2) {
        return Err(format!("Expected 2 python dependencies: {}", result));
    }

    let findings = result["suspicious_packages"]
        .as_array()
        .ok_or("Expected suspicious_packages array")?;
    if findings.len() != 1 {
        return Err(format!("Expected 1 finding, got {}", findings.len()));
    }
    let finding = &findings[0];
    if finding["name"] != "nonexistent-pkg-xyz"
        || finding["version"] != "1.0"
        || finding["ecosystem"] != "python"
        || finding["issue"] != "not found in registry"
        || finding["repository"] != "acme/api"
    {
        return Err(format!("Unexpected finding: {}", finding));
    }
    Ok(())
}

fn scenario_owner_scan_text(ctx: &TestContext) -> Result<(), String> {
    let env = ctx.create_env("owner-scan-text")?;
    let mut server = Server::new();
    use_mock_endpoints(&env, &server)?;
    let _forge = mock_owner_repo(&mut server, "requirements.txt", REQUIREMENTS_B64);
    let _pypi = mock_pypi(&mut server);

    let output = ctx.run_depscout(
        &env,
        &["--github-token", "t0ken", "--owner", "acme", "--output-format", "text"],
    )?;
    output.assert_success()?;
    output.assert_stdout_contains("acme/api")?;
    output.assert_stdout_contains("Stars: 12")?;
    output.assert_stdout_contains("Suspicious packages (1):")?;
    output.assert_stdout_contains("nonexistent-pkg-xyz 1.0 (python, runtime)")?;
    Ok(())
}

fn scenario_consolidated_dev_finding(ctx: &TestContext) -> Result<(), String> {
    let env = ctx.create_env("consolidated")?;
    let mut server = Server::new();
    use_mock_endpoints(&env, &server)?;
    let _forge = mock_owner_repo(&mut server, "package.json", PACKAGE_JSON_B64);
    let _npm = [
        mock_json(&mut server, "/left-pad", 200, r#"{"name":"left-pad"}"#),
        mock_json(&mut server, "/typosquat-lodash", 404, r#"{"error":"Not found"}"#),
    ];

    let output = ctx.run_depscout(
        &env,
        &["--github-token", "t0ken", "--owner", "acme", "--output-format", "tui"],
    )?;
    output.assert_success()?;
    output.assert_stdout_contains("Suspicious packages across 1 repositories: 1")?;
    output.assert_stdout_contains("acme/api  typosquat-lodash 1.0.0 (node, dev)")?;
    Ok(())
}

fn scenario_language_search(ctx: &TestContext) -> Result<(), String> {
    let env = ctx.create_env("language-search")?;
    let mut server = Server::new();
    use_mock_endpoints(&env, &server)?;
    let _search = server
        .mock("GET", "/search/repositories")
        .match_query(Matcher::UrlEncoded(
            "q".into(),
            "language:python stars:>=100 stars:<=500".into(),
        ))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"items":[
                {"full_name":"a/low","html_url":"https://github.com/a/low","stargazers_count":50},
                {"full_name":"a/mid","html_url":"https://github.com/a/mid","stargazers_count":200},
                {"full_name":"a/high","html_url":"https://github.com/a/high","stargazers_count":600}
            ]}"#,
        )
        .create();
    let _contents = server
        .mock("GET", Matcher::Regex(r"^/repos/a/mid/contents/".to_string()))
        .with_status(404)
        .with_body(r#"{"message":"Not Found"}"#)
        .create();

    let output = ctx.run_depscout(
        &env,
        &[
            "--github-token",
            "t0ken",
            "--language",
            "python",
            "--min-stars",
            "100",
            "--max-stars",
            "500",
        ],
    )?;
    output.assert_success()?;

    let json = output.report()?;
    let results = json.as_array().ok_or("Expected a JSON array")?;
    if results.len() != 1 || results[0]["repository"] != "a/mid" || results[0]["stars"] != 200 {
        return Err(format!("Expected only a/mid, got: {}", json));
    }
    if results[0]["suspicious_packages"].as_array().map(Vec::len) != Some(0) {
        return Err(format!("Expected no findings: {}", json));
    }
    Ok(())
}

fn scenario_unreachable_forge(ctx: &TestContext) -> Result<(), String> {
    let env = ctx.create_env("unreachable")?;
    env.write_config(r#"{"github_api_url": "http://127.0.0.1:9", "forge_timeout_secs": 2}"#)?;
    let output = ctx.run_depscout(&env, &["--github-token", "t0ken", "--owner", "acme"])?;
    output.assert_success()?;
    output.assert_stderr_contains("Error listing repositories for acme")?;
    if output.stdout.trim() != "[]" {
        return Err(format!("Expected an empty JSON array, got: {}", output.stdout));
    }
    Ok(())
}

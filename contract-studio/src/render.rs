//! HTML rendering for the studio pages and streamed fragments
//!
//! Full pages are rendered for `GET /`. Everything a run produces (the
//! echoed prompt, log panel, banners and the contract view) is rendered as a
//! fragment here and pushed to the browser over SSE, so the same markup is
//! used live and when the chat history is re-rendered on reload.

use crate::logview::{escape_html, render_log_html};
use crate::pipeline::{Clause, ContractResult, ModelChoice, ResultShapeError};
use crate::prompts::EXAMPLE_PROMPTS;
use crate::session::SessionState;

/// Title of the onboarding screen
pub const ONBOARDING_TITLE: &str = "🧠 Smart Contract Generator";

/// Title of the generator page
pub const MAIN_TITLE: &str = "🧠 Solidity Contract Generator";

/// Warning shown when Generate is pressed with an empty prompt
pub const EMPTY_PROMPT_WARNING: &str = "Please enter a contract description.";

/// Onboarding screen shown until the user presses "Got it!"
pub fn render_onboarding_page() -> String {
    let mut body = String::new();
    body.push_str(&format!(r#"<main class="onboarding"><h1>{ONBOARDING_TITLE}</h1>"#));
    body.push_str(ONBOARDING_BODY);
    body.push_str(
        r#"<form method="post" action="/onboarding/dismiss" class="dismiss">
<button type="submit">Got it!</button>
</form></main>"#,
    );
    page(ONBOARDING_TITLE, &body, None)
}

/// Generator page: sidebar, Generate button and the session transcript
pub fn render_main_page(state: &SessionState, log_height_px: u32) -> String {
    let mut body = String::from(r#"<div class="layout"><aside class="sidebar">"#);
    body.push_str("<h2>💬 Chat Assistant / Model</h2><h3>Example Prompts</h3>");

    for (index, example) in EXAMPLE_PROMPTS.iter().enumerate() {
        body.push_str(&format!(
            r#"<button type="button" class="example" data-index="{index}">{}</button>"#,
            escape_html(example.label)
        ));
    }

    body.push_str(r#"<label for="model">Choose generation model</label><select id="model">"#);
    for model in ModelChoice::ALL {
        body.push_str(&format!(
            r#"<option value="{}">{}</option>"#,
            model.id(),
            escape_html(model.label())
        ));
    }
    body.push_str("</select>");

    body.push_str(&format!(
        r#"<label for="chat-input">Ask or refine your contract...</label><textarea id="chat-input">{}</textarea>"#,
        escape_html(&state.chat_input)
    ));
    body.push_str(r#"</aside><main class="content">"#);

    body.push_str(&format!(
        r#"<h1>{MAIN_TITLE}</h1><button type="button" id="generate">Generate Contract</button><div id="notice"></div><div id="transcript">"#
    ));
    for exchange in &state.chat_history {
        body.push_str(r#"<div class="turn">"#);
        body.push_str(&render_user_message(&exchange.prompt));
        body.push_str(r#"<div class="chat assistant">"#);
        body.push_str(&render_contract(&exchange.contract));
        body.push_str("</div></div>");
    }
    body.push_str("</div>");

    if !state.crew_log.is_empty() {
        body.push_str(r#"<details class="last-log"><summary>Last run log</summary>"#);
        body.push_str(&render_log_html(&state.crew_log, log_height_px));
        body.push_str("</details>");
    }
    body.push_str("</main></div>");

    page(MAIN_TITLE, &body, Some(PAGE_SCRIPT))
}

/// Echo of the submitted prompt as a user chat message
pub fn render_user_message(prompt: &str) -> String {
    format!(
        r#"<div class="chat user"><span class="avatar">🧑</span><div class="bubble">{}</div></div>"#,
        escape_html(prompt)
    )
}

pub fn render_warning(message: &str) -> String {
    banner("banner-warning", &format!("⚠️ {message}"))
}

pub fn render_error(message: &str) -> String {
    banner("banner-error", message)
}

/// Error banners for a result that is not a contract
pub fn render_shape_error(err: &ResultShapeError) -> String {
    let mut html = render_error(&format!("❌ {err}"));
    if let Some(keys) = err.keys_message() {
        html.push_str(&render_error(&keys));
    }
    html
}

/// Contract view: success banner, clauses, source and validation status
pub fn render_contract(contract: &ContractResult) -> String {
    let mut html = banner("banner-success", "Generated Contract");

    html.push_str("<h3>📖 Clauses</h3>");
    if contract.clauses.is_empty() {
        html.push_str("<p>No clauses found.</p>");
    } else {
        html.push_str(r#"<ul class="clause-list">"#);
        for clause in &contract.clauses {
            html.push_str(&render_clause(clause));
        }
        html.push_str("</ul>");
    }

    html.push_str(&format!(
        r#"<pre><code class="language-solidity">{}</code></pre>"#,
        escape_html(&contract.contract_code)
    ));

    html.push_str("<h3>🧪 Validation Results</h3>");
    html.push_str(&if contract.is_compilable {
        banner("banner-success", "Contract is compilable")
    } else {
        banner(
            "banner-error",
            &format!("Contract failed compilation: \n{}", contract.compiler_errors),
        )
    });
    html.push_str(&if contract.is_deployable {
        banner("banner-success", "Contract is deployable")
    } else {
        banner(
            "banner-error",
            &format!("Contract failed deployment: \n{}", contract.deploy_errors),
        )
    });

    html
}

/// Missing fields are shown as "None"
fn render_clause(clause: &Clause) -> String {
    format!(
        r#"<li class="clause">• <strong>{}</strong> — {}</li>"#,
        escape_html(clause.title.as_deref().unwrap_or("None")),
        escape_html(clause.description.as_deref().unwrap_or("None"))
    )
}

fn banner(class: &str, text: &str) -> String {
    format!(r#"<div class="banner {class}">{}</div>"#, escape_html(text))
}

fn page(title: &str, body: &str, script: Option<&str>) -> String {
    let mut html = String::from(r#"<!DOCTYPE html><html lang="en"><head><meta charset="UTF-8">"#);
    html.push_str(r#"<meta name="viewport" content="width=device-width, initial-scale=1.0">"#);
    html.push_str(&format!("<title>{}</title>", escape_html(title)));
    html.push_str(PAGE_STYLE);
    html.push_str("</head><body>");
    html.push_str(body);
    if let Some(script) = script {
        html.push_str(script);
    }
    html.push_str("</body></html>");
    html
}

const ONBOARDING_BODY: &str = r#"
<section>
<h2>📘 Project Overview</h2>
<p>Writing smart contracts by hand is error prone: a missing initialization,
a wrong modifier or an unsafe state update can break a contract or open a
vulnerability. This app turns a plain-language idea into a Solidity contract,
compiles and deploys it in a sandbox, repairs whatever fails, and hands back
the final version.</p>
</section>
<section>
<h2>⚙️ Methodology</h2>
<p><strong>1) Generation</strong>: the model turns your description into a full Solidity contract with events, modifiers, comments and clauses.</p>
<p><strong>2) Validation</strong>: the contract is compiled and deployed, producing <code>is_compilable</code>, <code>is_deployable</code>, <code>compiler_errors</code> and <code>deploy_errors</code>.</p>
<p><strong>3) Refinement</strong>: when any error is reported, the model receives the exact error output and rebuilds a corrected contract that keeps the original behavior.</p>
<p>The loop repeats until the contract deploys or the pipeline settles on its best version.</p>
</section>
<section>
<h2>🤖 Why Agentics?</h2>
<p>Plain prompting does not reliably produce contracts that compile.
<strong>Agentics</strong> breaks the work into structured, repeatable steps:</p>
<ul>
<li>Separate tasks for generation, validation and refinement</li>
<li>Shared memory, so each step sees what came before</li>
<li>Refinement that only runs when errors were reported</li>
<li>Pydantic schemas that keep every result a structured SmartContract</li>
<li>MCP tool calls for compilation, deployment and LLM-based fixes</li>
</ul>
<p>The model becomes part of a controlled, checkable system instead of a free-form text generator.</p>
</section>
<section>
<h2>🛠️ Tech Stack</h2>
<p><strong>Agent system:</strong></p>
<ul>
<li><a href="https://github.com/IBM/Agentics" target="_blank">Agentics (IBM Research)</a>: task coordination, memory and multi-step execution</li>
<li>CrewAI: task execution, memory state and tool routing</li>
<li>Pydantic: the SmartContract schema</li>
<li>MCP (Model Context Protocol): tools connected over stdio</li>
<li>Google Gemini 2.0 Flash: main model for generation and refinement</li>
<li>FSM Fine-Tuned TinyLlama: lightweight alternative model</li>
</ul>
<p><strong>Tools:</strong></p>
<ul>
<li><code>generate_smart_contract</code>: first draft</li>
<li><code>validate_smart_contract</code>: compile and deploy checks</li>
<li><code>refine_contract</code>: LLM-driven correction</li>
<li>DuckDuckGo search for background information</li>
</ul>
<p><strong>Front end:</strong> live log streaming and a contract viewer served by this app.</p>
</section>
<section>
<h2>🚀 How to Use This App</h2>
<ol>
<li><strong>Describe the contract idea.</strong> More detail gives better code.</li>
<li><strong>Click "Generate Contract"</strong> to start the pipeline.</li>
<li><strong>Watch the live logs</strong> as the contract is generated, compiled, deployed and refined.</li>
<li><strong>Review the results</strong>: Solidity source, clauses and validation status.</li>
</ol>
<p>Useful for learning, prototyping, auditing and fast contract development.</p>
</section>
<section>
<h2>👥 Collaborators</h2>
<div class="credits">
<strong>Project Team</strong><br/>
<a href="https://www.linkedin.com/in/chaityas/" target="_blank">Chaitya Shah</a> | MS in Data Science, Columbia University<br/>
<a href="https://www.linkedin.com/in/chunghyun-han-355b80244/" target="_blank">Chunghyun Han</a> | MS in Operations Research, Columbia University<br/>
<a href="https://www.linkedin.com/in/nami-jain/" target="_blank">Nami Jain</a> | MS in Data Science, Columbia University<br/>
<a href="https://www.linkedin.com/in/yegan-dhaivakumar" target="_blank">Yegan Dhaivakumar</a> | MS in Data Science, Columbia University<br/><br/>
<strong>Faculty Advisors</strong><br/>
<a href="https://www.linkedin.com/in/gliozzo/" target="_blank">Alfio Gliozzo</a> | Chief Science Catalyst, IBM Research<br/>
<a href="https://www.linkedin.com/in/agostino-capponi-842b41a5/" target="_blank">Agostino Capponi</a> | Professor, Columbia University
</div>
<p><a class="repo-link" href="https://github.com/AgenticsFintekColumbia/smart-contracts/" target="_blank">GitHub Repository</a></p>
</section>
"#;

const PAGE_STYLE: &str = r#"<style>
    :root {
        --bg: #0e1117;
        --card: #161b26;
        --accent: #262d3d;
        --highlight: #ff4b4b;
        --text: #fafafa;
        --muted: #9aa0ab;
        --success: #4ade80;
        --error: #f87171;
        --warning: #facc15;
    }
    * { box-sizing: border-box; }
    body {
        margin: 0;
        font-family: 'Source Sans Pro', 'Segoe UI', sans-serif;
        background: var(--bg);
        color: var(--text);
    }
    h1 { color: var(--text); }
    h3 { margin-top: 24px; }
    a { color: var(--highlight); }
    .onboarding { max-width: 900px; margin: 0 auto; padding: 40px 20px; }
    .onboarding section { border-top: 1px solid var(--accent); padding-top: 12px; }
    .dismiss { display: flex; justify-content: center; margin: 30px 0; }
    .layout { display: grid; grid-template-columns: 320px 1fr; min-height: 100vh; }
    .sidebar { background: var(--card); padding: 20px; display: flex; flex-direction: column; gap: 10px; }
    .content { padding: 20px 40px; max-width: 1100px; }
    label { font-size: 0.85rem; color: var(--muted); margin-top: 10px; }
    textarea, select {
        width: 100%;
        background: var(--bg);
        border: 1px solid var(--accent);
        border-radius: 8px;
        padding: 10px;
        color: var(--text);
        font-family: inherit;
    }
    textarea { height: 200px; resize: vertical; }
    textarea:focus, select:focus { outline: none; border-color: var(--highlight); }
    button {
        background: var(--accent);
        color: var(--text);
        border: 1px solid var(--accent);
        padding: 10px 20px;
        border-radius: 8px;
        cursor: pointer;
        text-align: left;
    }
    button:hover { border-color: var(--highlight); color: var(--highlight); }
    button:disabled { opacity: 0.5; cursor: not-allowed; }
    .chat { display: flex; gap: 10px; margin: 16px 0; }
    .chat.assistant { flex-direction: column; }
    .bubble { background: var(--card); padding: 10px 14px; border-radius: 8px; white-space: pre-wrap; }
    .banner { padding: 12px 16px; border-radius: 8px; margin: 8px 0; white-space: pre-wrap; }
    .banner-success { background: rgba(74, 222, 128, 0.15); color: var(--success); }
    .banner-error { background: rgba(248, 113, 113, 0.15); color: var(--error); }
    .banner-warning { background: rgba(250, 204, 21, 0.15); color: var(--warning); }
    .clause-list { list-style: none; padding-left: 0; }
    pre {
        background: var(--card);
        padding: 16px;
        border-radius: 8px;
        overflow-x: auto;
    }
    .log-box {
        overflow-y: auto;
        background-color: #111;
        color: #0f0;
        font-family: monospace;
        font-size: 0.8rem;
        padding: 10px;
        border-radius: 8px;
        white-space: pre-wrap;
    }
    .credits { font-size: 0.9rem; color: #cccccc; }
    .spinner { color: var(--muted); font-style: italic; }
    .last-log summary { cursor: pointer; color: var(--muted); margin: 16px 0 8px; }
</style>"#;

const PAGE_SCRIPT: &str = r#"<script>
(() => {
    const input = document.getElementById('chat-input');
    const model = document.getElementById('model');
    const notice = document.getElementById('notice');
    const transcript = document.getElementById('transcript');
    const generate = document.getElementById('generate');

    function scheduleScroll(slot) {
        const box = slot.querySelector('.log-box');
        if (!box) return;
        const delay = Number(box.dataset.autoscrollMs || 20);
        setTimeout(() => { box.scrollTop = box.scrollHeight; }, delay);
    }

    document.querySelectorAll('button.example').forEach((button) => {
        button.addEventListener('click', async () => {
            const response = await fetch('/prompts/example', {
                method: 'POST',
                headers: { 'Content-Type': 'application/json' },
                body: JSON.stringify({ index: Number(button.dataset.index) }),
            });
            if (response.ok) {
                input.value = (await response.json()).prompt;
            }
        });
    });

    generate.addEventListener('click', async () => {
        notice.innerHTML = '';
        const response = await fetch('/runs', {
            method: 'POST',
            headers: { 'Content-Type': 'application/json' },
            body: JSON.stringify({ prompt: input.value, model: model.value }),
        });
        const isJson = (response.headers.get('content-type') || '').includes('application/json');
        const data = isJson ? await response.json() : {};
        if (!response.ok) {
            notice.innerHTML = data.html
                || `<div class="banner banner-error">Request failed (${response.status})</div>`;
            return;
        }

        generate.disabled = true;
        const turn = document.createElement('div');
        turn.className = 'turn';
        transcript.appendChild(turn);

        const finish = (source) => {
            source.close();
            turn.querySelectorAll('.spinner').forEach((spinner) => spinner.remove());
            generate.disabled = false;
        };

        const source = new EventSource(`/runs/${data.run_id}/events`);
        source.addEventListener('user', (event) => {
            turn.insertAdjacentHTML('beforeend', event.data);
            turn.insertAdjacentHTML('beforeend',
                '<div class="chat assistant"><p>Running Agent...</p><div class="log-slot"></div><p class="spinner">Generating contract...</p><div class="result-slot"></div></div>');
        });
        source.addEventListener('log', (event) => {
            const slot = turn.querySelector('.log-slot');
            slot.innerHTML = event.data;
            scheduleScroll(slot);
        });
        ['warning', 'failure', 'result'].forEach((name) => {
            source.addEventListener(name, (event) => {
                turn.querySelector('.result-slot').insertAdjacentHTML('beforeend', event.data);
            });
        });
        source.addEventListener('done', () => finish(source));
        source.onerror = () => finish(source);
    });
})();
</script>"#;

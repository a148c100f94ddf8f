//! In-process bridge to the Python agent pipeline via PyO3
//!
//! Calls `<module>.<function>(prompt, model_choice=..., on_log=...)` and
//! expects a `(result, final_log)` tuple back. The call blocks for the whole
//! pipeline run, so it is moved onto the blocking thread pool; `on_log` is a
//! Rust closure exposed to Python as a callable.

use super::{
    ContractPipeline, LogSink, PipelineError, PipelineRequest, PipelineRun, RawClause, RawResult,
    ResultFields,
};
use async_trait::async_trait;
use pyo3::prelude::*;
use pyo3::types::{PyCFunction, PyDict, PyList, PyTuple};
use serde_json::{Map, Value};
use std::sync::Once;
use tracing::{debug, info};

static PY_INIT: Once = Once::new();

/// Pipeline implemented by a Python callable
#[derive(Clone)]
pub struct PythonPipeline {
    module: String,
    function: String,
    /// Extra entries prepended to `sys.path`
    python_path: Vec<String>,
    name: String,
}

impl PythonPipeline {
    pub fn new(
        module: impl Into<String>,
        function: impl Into<String>,
        python_path: Vec<String>,
    ) -> Self {
        let module = module.into();
        let function = function.into();
        let name = format!("python:{}.{}", module, function);

        Self {
            module,
            function,
            python_path,
            name,
        }
    }

    fn invoke(
        &self,
        request: &PipelineRequest,
        on_log: LogSink,
    ) -> Result<PipelineRun, PipelineError> {
        PY_INIT.call_once(pyo3::prepare_freethreaded_python);

        Python::with_gil(|py| -> PyResult<PipelineRun> {
            let sys_path = py.import("sys")?.getattr("path")?.downcast_into::<PyList>()?;
            for entry in self.python_path.iter().rev() {
                if !sys_path.contains(entry.as_str())? {
                    sys_path.insert(0, entry.as_str())?;
                }
            }

            let callable = py.import(self.module.as_str())?.getattr(self.function.as_str())?;

            let callback = PyCFunction::new_closure(
                py,
                None,
                None,
                move |args: &Bound<'_, PyTuple>, _kwargs: Option<&Bound<'_, PyDict>>| -> PyResult<()> {
                    let text: Option<String> = args.get_item(0)?.extract()?;
                    on_log(text.as_deref().unwrap_or_default());
                    Ok(())
                },
            )?;

            let kwargs = PyDict::new(py);
            kwargs.set_item("model_choice", request.model.id())?;
            kwargs.set_item("on_log", callback)?;

            let returned = callable.call((request.prompt.as_str(),), Some(&kwargs))?;
            let (result, final_log): (Bound<'_, PyAny>, Option<String>) = returned.extract()?;

            Ok(PipelineRun {
                result: raw_result(&result)?,
                final_log,
            })
        })
        .map_err(|e| PipelineError::Raised(e.to_string()))
    }
}

/// Convert the returned Python value, probing attributes before mapping access
fn raw_result(obj: &Bound<'_, PyAny>) -> PyResult<RawResult> {
    let type_name = obj.get_type().name()?.to_string();

    if obj.hasattr("contract_code")? {
        let clauses = match optional_attr(obj, "clauses")? {
            Some(items) => items
                .try_iter()?
                .map(|item| raw_clause(&item?))
                .collect::<PyResult<Vec<_>>>()?,
            None => Vec::new(),
        };

        let fields = ResultFields {
            contract_code: Some(attr_text(obj, "contract_code")?.unwrap_or_default()),
            clauses,
            is_compilable: attr_truthy(obj, "is_compilable")?,
            is_deployable: attr_truthy(obj, "is_deployable")?,
            compiler_errors: attr_text(obj, "compiler_errors")?,
            deploy_errors: attr_text(obj, "deploy_errors")?,
        };
        return Ok(RawResult::Object { type_name, fields });
    }

    if let Ok(dict) = obj.downcast::<PyDict>() {
        let keys = dict
            .keys()
            .iter()
            .map(|key| key.str().map(|s| s.to_string()))
            .collect::<PyResult<Vec<_>>>()?;
        return Ok(RawResult::Mapping { type_name, keys });
    }

    Ok(RawResult::Other { type_name })
}

fn raw_clause(item: &Bound<'_, PyAny>) -> PyResult<RawClause> {
    if let Ok(dict) = item.downcast::<PyDict>() {
        let mut entries = Map::new();
        for (key, value) in dict.iter() {
            let value = if value.is_none() {
                Value::Null
            } else {
                Value::String(value.str()?.to_string())
            };
            entries.insert(key.str()?.to_string(), value);
        }
        return Ok(RawClause::Mapping(entries));
    }

    Ok(RawClause::Object {
        title: attr_text(item, "title")?,
        description: attr_text(item, "description")?,
    })
}

/// Attribute value, or `None` when absent or Python `None`
fn optional_attr<'py>(obj: &Bound<'py, PyAny>, name: &str) -> PyResult<Option<Bound<'py, PyAny>>> {
    if !obj.hasattr(name)? {
        return Ok(None);
    }
    let value = obj.getattr(name)?;
    Ok(if value.is_none() { None } else { Some(value) })
}

fn attr_text(obj: &Bound<'_, PyAny>, name: &str) -> PyResult<Option<String>> {
    optional_attr(obj, name)?
        .map(|value| value.str().map(|s| s.to_string()))
        .transpose()
}

fn attr_truthy(obj: &Bound<'_, PyAny>, name: &str) -> PyResult<Option<bool>> {
    if !obj.hasattr(name)? {
        return Ok(None);
    }
    obj.getattr(name)?.is_truthy().map(Some)
}

#[async_trait]
impl ContractPipeline for PythonPipeline {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(
        &self,
        request: &PipelineRequest,
        on_log: LogSink,
    ) -> Result<PipelineRun, PipelineError> {
        info!(pipeline = %self.name, model = %request.model, "Calling Python pipeline");

        let pipeline = self.clone();
        let request = request.clone();

        let run = tokio::task::spawn_blocking(move || pipeline.invoke(&request, on_log))
            .await
            .map_err(|e| PipelineError::TaskFailed(e.to_string()))??;

        debug!(
            result_type = run.result.type_name(),
            has_final_log = run.final_log.is_some(),
            "Python pipeline returned"
        );
        Ok(run)
    }
}

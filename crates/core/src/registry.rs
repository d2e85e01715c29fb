// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The in-memory table of loaded job configs and their running instances.

use crate::job::{Job, JobConfig, ProcessType};
use std::collections::HashMap;
use std::rc::Rc;

/// Holds every loaded [`JobConfig`] and every [`Job`] instance spawned from
/// one. Single-instance jobs have exactly one [`Job`] keyed by an empty
/// instance string; `instance $VAR` jobs accumulate one per distinct value
/// of `$VAR` that has ever been started.
#[derive(Debug, Default)]
pub struct JobRegistry {
    configs: HashMap<String, Rc<JobConfig>>,
    jobs: HashMap<String, Job>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load or replace a job config. Existing running instances are left
    /// alone; re-exec logic in `upstart-engine` decides whether to let them
    /// finish under the old config or pick up the new one.
    ///
    /// Also materializes the config's single (non-templated) instance, in
    /// `Waiting`, if it doesn't exist yet: a `start on` condition is
    /// tracked by a `Job`'s own condition tree (so distinct `instance
    /// $VAR` jobs can match independently), which means something has to
    /// exist to hold that tree before the first event arrives, or a job
    /// that has never been explicitly started could never auto-start.
    /// Instance-templated jobs aren't materialized here — their instance
    /// name isn't known until a matching event's environment supplies it.
    pub fn set_config(&mut self, config: JobConfig) {
        let name = config.name.clone();
        let config = Rc::new(config);
        self.configs.insert(name.clone(), config.clone());
        let key = Job::new(&name, "").key();
        self.jobs.entry(key).or_insert_with(|| Job::from_config(&config, ""));
    }

    pub fn config(&self, name: &str) -> Option<&Rc<JobConfig>> {
        self.configs.get(name)
    }

    pub fn remove_config(&mut self, name: &str) -> Option<Rc<JobConfig>> {
        self.configs.remove(name)
    }

    pub fn config_names(&self) -> impl Iterator<Item = &str> {
        self.configs.keys().map(String::as_str)
    }

    /// Get the job instance for `(config_name, instance)`, creating it
    /// (in the `Waiting`/`Stop` state) if it doesn't exist yet.
    pub fn instance(&mut self, config_name: &str, instance: &str) -> &mut Job {
        let key = Job::new(config_name, instance).key();
        let config = self.configs.get(config_name).cloned();
        self.jobs.entry(key).or_insert_with(|| match config {
            Some(config) => Job::from_config(&config, instance),
            None => Job::new(config_name, instance),
        })
    }

    pub fn get(&self, config_name: &str, instance: &str) -> Option<&Job> {
        self.jobs.get(&Job::new(config_name, instance).key())
    }

    pub fn get_mut(&mut self, config_name: &str, instance: &str) -> Option<&mut Job> {
        self.jobs.get_mut(&Job::new(config_name, instance).key())
    }

    pub fn remove(&mut self, config_name: &str, instance: &str) -> Option<Job> {
        self.jobs.remove(&Job::new(config_name, instance).key())
    }

    pub fn jobs(&self) -> impl Iterator<Item = &Job> {
        self.jobs.values()
    }

    pub fn jobs_for_config<'a>(&'a self, config_name: &'a str) -> impl Iterator<Item = &'a Job> {
        self.jobs
            .values()
            .filter(move |job| job.config_name == config_name)
    }

    /// Find the job (and which process slot) that owns a given pid. The
    /// reaper uses this to route a `SIGCHLD` reap to the right job.
    pub fn find_by_pid(&self, pid: i32) -> Option<(&Job, ProcessType)> {
        self.jobs.values().find_map(|job| {
            job.find_by_pid(pid).map(|process| (job, process))
        })
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;

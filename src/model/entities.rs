use chrono::{DateTime, Utc};
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::model::{Entity, EntityMeta, Id, Language, RelationDef};

pub const REGION: EntityMeta = EntityMeta {
    name: "region",
    resource: "regions",
    fields: &["regionName"],
    relations: &[],
};

pub const COUNTRY: EntityMeta = EntityMeta {
    name: "country",
    resource: "countries",
    fields: &["countryName"],
    relations: &[RelationDef::single("regionId", "region")],
};

pub const LOCATION: EntityMeta = EntityMeta {
    name: "location",
    resource: "locations",
    fields: &["streetAddress", "postalCode", "city", "stateProvince"],
    relations: &[RelationDef::single("countryId", "country")],
};

pub const DEPARTMENT: EntityMeta = EntityMeta {
    name: "department",
    resource: "departments",
    fields: &["departmentName"],
    relations: &[RelationDef::single("locationId", "location")],
};

pub const EMPLOYEE: EntityMeta = EntityMeta {
    name: "employee",
    resource: "employees",
    fields: &[
        "firstName",
        "lastName",
        "email",
        "phoneNumber",
        "hireDate",
        "salary",
        "commissionPct",
    ],
    relations: &[
        RelationDef::single("departmentId", "department"),
        RelationDef::single("managerId", "employee"),
    ],
};

pub const JOB: EntityMeta = EntityMeta {
    name: "job",
    resource: "jobs",
    fields: &["jobTitle", "minSalary", "maxSalary"],
    relations: &[
        RelationDef::single("employeeId", "employee"),
        RelationDef::multi("tasks", "task", "title"),
    ],
};

pub const TASK: EntityMeta = EntityMeta {
    name: "task",
    resource: "tasks",
    fields: &["title", "description"],
    relations: &[],
};

pub const JOB_HISTORY: EntityMeta = EntityMeta {
    name: "jobHistory",
    resource: "job-histories",
    fields: &["startDate", "endDate", "language"],
    relations: &[
        RelationDef::single("jobId", "job"),
        RelationDef::single("departmentId", "department"),
        RelationDef::single("employeeId", "employee"),
    ],
};

/// Every entity type, in menu order
pub const ALL_ENTITIES: [&EntityMeta; 8] = [
    &REGION,
    &COUNTRY,
    &LOCATION,
    &DEPARTMENT,
    &TASK,
    &EMPLOYEE,
    &JOB,
    &JOB_HISTORY,
];

pub fn meta_by_name(name: &str) -> Option<&'static EntityMeta> {
    ALL_ENTITIES
        .iter()
        .copied()
        .find(|meta| meta.name == name || meta.resource == name)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Region {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Id>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Country {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Id>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_name: Option<String>,
    /// Foreign keys always serialize; `null` removes the relation on save
    pub region_id: Option<Id>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Id>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub street_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_province: Option<String>,
    pub country_id: Option<Id>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Department {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Id>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department_name: Option<String>,
    pub location_id: Option<Id>,
    /// Server-side nested collection, never edited from the department form
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employees: Option<Vec<Employee>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Id>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hire_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub salary: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commission_pct: Option<i64>,
    pub department_id: Option<Id>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jobs: Option<Vec<Job>>,
    pub manager_id: Option<Id>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Id>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_salary: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_salary: Option<i64>,
    pub employee_id: Option<Id>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tasks: Option<Vec<Task>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Id>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jobs: Option<Vec<Job>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobHistory {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Id>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<Language>,
    pub job_id: Option<Id>,
    pub department_id: Option<Id>,
    pub employee_id: Option<Id>,
}

impl Entity for Region {
    fn meta() -> &'static EntityMeta {
        &REGION
    }

    fn id(&self) -> Option<Id> {
        self.id
    }
}

impl Entity for Country {
    fn meta() -> &'static EntityMeta {
        &COUNTRY
    }

    fn id(&self) -> Option<Id> {
        self.id
    }
}

impl Entity for Location {
    fn meta() -> &'static EntityMeta {
        &LOCATION
    }

    fn id(&self) -> Option<Id> {
        self.id
    }
}

impl Entity for Department {
    fn meta() -> &'static EntityMeta {
        &DEPARTMENT
    }

    fn id(&self) -> Option<Id> {
        self.id
    }
}

impl Entity for Employee {
    fn meta() -> &'static EntityMeta {
        &EMPLOYEE
    }

    fn id(&self) -> Option<Id> {
        self.id
    }
}

impl Entity for Job {
    fn meta() -> &'static EntityMeta {
        &JOB
    }

    fn id(&self) -> Option<Id> {
        self.id
    }
}

impl Job {
    /// Task titles as the job detail view lists them
    pub fn task_titles(&self) -> String {
        self.tasks
            .iter()
            .flatten()
            .filter_map(|task| task.title.as_deref())
            .join(", ")
    }
}

impl Entity for Task {
    fn meta() -> &'static EntityMeta {
        &TASK
    }

    fn id(&self) -> Option<Id> {
        self.id
    }
}

impl Entity for JobHistory {
    fn meta() -> &'static EntityMeta {
        &JOB_HISTORY
    }

    fn id(&self) -> Option<Id> {
        self.id
    }

    fn apply_defaults(&mut self) {
        if self.language.is_none() {
            self.language = Some(Language::default());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_job_deserializes_nested_tasks() {
        let json = json!({
            "id": 3,
            "jobTitle": "Engineer",
            "minSalary": 1000,
            "employeeId": 12,
            "tasks": [{"id": 1, "title": "Build"}, {"id": 2, "title": "Test"}]
        });

        let job: Job = serde_json::from_value(json).unwrap();
        assert_eq!(job.id, Some(3));
        assert_eq!(job.employee_id, Some(12));
        assert_eq!(job.max_salary, None);
        let titles: Vec<_> = job
            .tasks
            .unwrap()
            .into_iter()
            .filter_map(|task| task.title)
            .collect();
        assert_eq!(titles, vec!["Build", "Test"]);
    }

    #[test]
    fn test_job_task_titles() {
        let job = Job {
            tasks: Some(vec![
                Task {
                    title: Some("Plan".to_string()),
                    ..Default::default()
                },
                Task::default(),
                Task {
                    title: Some("Review".to_string()),
                    ..Default::default()
                },
            ]),
            ..Default::default()
        };
        assert_eq!(job.task_titles(), "Plan, Review");
        assert_eq!(Job::default().task_titles(), "");
    }

    #[test]
    fn test_unsaved_entity_serializes_without_id() {
        let region = Region {
            id: None,
            region_name: Some("Europe".to_string()),
        };
        let json = serde_json::to_string(&region).unwrap();
        assert_eq!(json, r#"{"regionName":"Europe"}"#);
    }

    #[test]
    fn test_job_history_language_defaults_to_french() {
        let mut history = JobHistory::default();
        history.apply_defaults();
        assert_eq!(history.language, Some(Language::French));

        let mut spanish = JobHistory {
            language: Some(Language::Spanish),
            ..Default::default()
        };
        spanish.apply_defaults();
        assert_eq!(spanish.language, Some(Language::Spanish));
    }

    #[test]
    fn test_field_text_reads_wire_names() {
        let task = Task {
            id: Some(9),
            title: Some("Review".to_string()),
            ..Default::default()
        };
        assert_eq!(task.field_text("title"), Some("Review".to_string()));
        assert_eq!(task.field_text("id"), Some("9".to_string()));
        assert_eq!(task.field_text("description"), None);
    }

    #[test]
    fn test_meta_lookup_and_relation_targets() {
        assert_eq!(meta_by_name("job-histories"), Some(&JOB_HISTORY));
        assert_eq!(meta_by_name("task"), Some(&TASK));
        assert!(meta_by_name("payroll").is_none());

        assert_eq!(
            JOB_HISTORY.relation_targets(),
            vec!["job", "department", "employee"]
        );
        let tasks = JOB.relation("tasks").unwrap();
        assert!(tasks.is_multi());
        assert!(!JOB.relation("employeeId").unwrap().is_multi());
        assert!(EMPLOYEE.has_field("hireDate"));
    }

    #[test]
    fn test_every_relation_target_is_known() {
        for meta in ALL_ENTITIES {
            for relation in meta.relations {
                assert!(
                    meta_by_name(relation.target).is_some(),
                    "{} points at unknown entity {}",
                    meta.name,
                    relation.target
                );
            }
        }
    }
}

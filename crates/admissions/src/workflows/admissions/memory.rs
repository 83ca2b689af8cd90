use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use super::audit::{NewOperationLog, OperationLog};
use super::domain::{
    ApplicationId, ApplicationRecord, DrawId, DrawRecord, LogId, PhaseId, QualificationId,
    QualificationRecord, StudentId, StudentRecord, TeacherId, TeacherRecord,
};
use super::phases::ProcessPhase;
use super::repository::{
    AdmissionsRepository, NewApplication, NewDraw, NewPhase, NewQualification, NewStudent,
    NewTeacher, RecordTransaction, RepositoryError,
};

/// Process-local store. Each transaction works on a copy of the records and swaps it in on
/// commit, so a failed unit of work leaves nothing behind. The operation log is append-only
/// and stays outside the copy: new entries are staged and appended on commit.
#[derive(Default, Clone)]
pub struct InMemoryAdmissionsStore {
    ledger: Arc<Mutex<Ledger>>,
}

#[derive(Debug, Default)]
struct Ledger {
    records: StoreState,
    logs: Vec<OperationLog>,
}

impl InMemoryAdmissionsStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AdmissionsRepository for InMemoryAdmissionsStore {
    fn transaction<T, E>(
        &self,
        work: impl FnOnce(&mut dyn RecordTransaction) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<RepositoryError>,
    {
        let mut guard = self
            .ledger
            .lock()
            .map_err(|_| RepositoryError::Unavailable("store mutex poisoned".to_string()))?;
        let ledger = &mut *guard;

        let mut working = Working {
            records: ledger.records.clone(),
            committed_logs: &ledger.logs,
            staged_logs: Vec::new(),
        };
        let tx: &mut dyn RecordTransaction = &mut working;
        let value = work(tx)?;
        let Working {
            records,
            staged_logs,
            ..
        } = working;
        ledger.records = records;
        ledger.logs.extend(staged_logs);
        Ok(value)
    }
}

#[derive(Debug, Default, Clone)]
struct Sequences {
    student: u64,
    teacher: u64,
    application: u64,
    qualification: u64,
    draw: u64,
    phase: u64,
    log: u64,
}

fn bump(counter: &mut u64) -> u64 {
    *counter += 1;
    *counter
}

#[derive(Debug, Default, Clone)]
struct StoreState {
    sequences: Sequences,
    students: BTreeMap<StudentId, StudentRecord>,
    teachers: BTreeMap<TeacherId, TeacherRecord>,
    applications: BTreeMap<ApplicationId, ApplicationRecord>,
    qualifications: BTreeMap<QualificationId, QualificationRecord>,
    draws: BTreeMap<DrawId, DrawRecord>,
    phases: BTreeMap<PhaseId, ProcessPhase>,
}

/// One open transaction: a private copy of the records plus the log entries it has staged.
struct Working<'a> {
    records: StoreState,
    committed_logs: &'a [OperationLog],
    staged_logs: Vec<OperationLog>,
}

fn replace<K: Ord, V>(map: &mut BTreeMap<K, V>, key: K, value: V) -> Result<(), RepositoryError> {
    match map.get_mut(&key) {
        Some(slot) => {
            *slot = value;
            Ok(())
        }
        None => Err(RepositoryError::NotFound),
    }
}

fn remove<K: Ord, V>(map: &mut BTreeMap<K, V>, key: &K) -> Result<(), RepositoryError> {
    map.remove(key).map(|_| ()).ok_or(RepositoryError::NotFound)
}

impl RecordTransaction for Working<'_> {
    fn students(&self) -> Result<Vec<StudentRecord>, RepositoryError> {
        Ok(self.records.students.values().cloned().collect())
    }

    fn insert_student(&mut self, student: NewStudent) -> Result<StudentRecord, RepositoryError> {
        if self
            .records
            .students
            .values()
            .any(|existing| existing.user_id == student.user_id)
        {
            return Err(RepositoryError::Conflict);
        }
        let id = StudentId(bump(&mut self.records.sequences.student));
        let record = student.into_record(id);
        self.records.students.insert(id, record.clone());
        Ok(record)
    }

    fn update_student(&mut self, student: StudentRecord) -> Result<(), RepositoryError> {
        replace(&mut self.records.students, student.id, student)
    }

    fn delete_student(&mut self, id: StudentId) -> Result<(), RepositoryError> {
        remove(&mut self.records.students, &id)
    }

    fn teachers(&self) -> Result<Vec<TeacherRecord>, RepositoryError> {
        Ok(self.records.teachers.values().cloned().collect())
    }

    fn insert_teacher(&mut self, teacher: NewTeacher) -> Result<TeacherRecord, RepositoryError> {
        if self
            .records
            .teachers
            .values()
            .any(|existing| existing.user_id == teacher.user_id)
        {
            return Err(RepositoryError::Conflict);
        }
        let id = TeacherId(bump(&mut self.records.sequences.teacher));
        let record = teacher.into_record(id);
        self.records.teachers.insert(id, record.clone());
        Ok(record)
    }

    fn update_teacher(&mut self, teacher: TeacherRecord) -> Result<(), RepositoryError> {
        replace(&mut self.records.teachers, teacher.id, teacher)
    }

    fn delete_teacher(&mut self, id: TeacherId) -> Result<(), RepositoryError> {
        remove(&mut self.records.teachers, &id)
    }

    fn applications(&self) -> Result<Vec<ApplicationRecord>, RepositoryError> {
        Ok(self.records.applications.values().cloned().collect())
    }

    fn insert_application(
        &mut self,
        application: NewApplication,
    ) -> Result<ApplicationRecord, RepositoryError> {
        let id = ApplicationId(bump(&mut self.records.sequences.application));
        let record = application.into_record(id);
        self.records.applications.insert(id, record.clone());
        Ok(record)
    }

    fn update_application(
        &mut self,
        application: ApplicationRecord,
    ) -> Result<(), RepositoryError> {
        replace(&mut self.records.applications, application.id, application)
    }

    fn delete_application(&mut self, id: ApplicationId) -> Result<(), RepositoryError> {
        remove(&mut self.records.applications, &id)
    }

    fn qualifications(&self) -> Result<Vec<QualificationRecord>, RepositoryError> {
        Ok(self.records.qualifications.values().cloned().collect())
    }

    fn insert_qualification(
        &mut self,
        qualification: NewQualification,
    ) -> Result<QualificationRecord, RepositoryError> {
        if self.records.qualifications.values().any(|existing| {
            existing.teacher_id == qualification.teacher_id && existing.year == qualification.year
        }) {
            return Err(RepositoryError::Conflict);
        }
        let id = QualificationId(bump(&mut self.records.sequences.qualification));
        let record = qualification.into_record(id);
        self.records.qualifications.insert(id, record.clone());
        Ok(record)
    }

    fn update_qualification(
        &mut self,
        qualification: QualificationRecord,
    ) -> Result<(), RepositoryError> {
        replace(&mut self.records.qualifications, qualification.id, qualification)
    }

    fn delete_qualification(&mut self, id: QualificationId) -> Result<(), RepositoryError> {
        remove(&mut self.records.qualifications, &id)
    }

    fn draws(&self) -> Result<Vec<DrawRecord>, RepositoryError> {
        Ok(self.records.draws.values().cloned().collect())
    }

    fn insert_draw(&mut self, draw: NewDraw) -> Result<DrawRecord, RepositoryError> {
        let id = DrawId(bump(&mut self.records.sequences.draw));
        let record = draw.into_record(id);
        self.records.draws.insert(id, record.clone());
        Ok(record)
    }

    fn delete_draw(&mut self, id: DrawId) -> Result<(), RepositoryError> {
        remove(&mut self.records.draws, &id)
    }

    fn phases(&self) -> Result<Vec<ProcessPhase>, RepositoryError> {
        Ok(self.records.phases.values().cloned().collect())
    }

    fn insert_phase(&mut self, phase: NewPhase) -> Result<ProcessPhase, RepositoryError> {
        let id = PhaseId(bump(&mut self.records.sequences.phase));
        let record = phase.into_record(id);
        self.records.phases.insert(id, record.clone());
        Ok(record)
    }

    fn update_phase(&mut self, phase: ProcessPhase) -> Result<(), RepositoryError> {
        replace(&mut self.records.phases, phase.id, phase)
    }

    fn logs(&self) -> Result<Vec<OperationLog>, RepositoryError> {
        Ok(self
            .committed_logs
            .iter()
            .chain(&self.staged_logs)
            .cloned()
            .collect())
    }

    fn append_log(&mut self, entry: NewOperationLog) -> Result<OperationLog, RepositoryError> {
        let log = entry.into_log(LogId(bump(&mut self.records.sequences.log)));
        self.staged_logs.push(log.clone());
        Ok(log)
    }
}

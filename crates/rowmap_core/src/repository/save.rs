//! Transactional save and remove.

use crate::driver::Condition;
use crate::entity::Entity;
use crate::error::{CoreError, CoreResult};
use crate::meta::{FieldKind, RelationKind, RelationshipDescriptor};
use crate::repository::report::{self, SaveOutcome, SaveReport};
use crate::repository::Repository;
use crate::value::Value;
use std::collections::BTreeMap;
use tracing::{debug, trace};

/// The statement bind plus the cascade work lists for one save call.
#[derive(Debug, Default)]
struct WritePlan {
    bind: BTreeMap<String, Value>,
    one_to_one: Vec<RelationshipDescriptor>,
    one_to_many: Vec<RelationshipDescriptor>,
    many_to_many: Vec<RelationshipDescriptor>,
}

impl Repository<'_> {
    /// Persists the entity and cascades its relationships.
    ///
    /// A clean entity with an identity is a no-op success. Otherwise the
    /// row is inserted (assigning the driver-generated identity) or
    /// updated by primary key, then relationship cascades run inside the
    /// same transaction: unidirectional one-to-one targets are saved with
    /// their back-reference set, one-to-many children likewise, and
    /// many-to-many join rows are fully replaced.
    ///
    /// With `begin_transaction` the call owns a scoped transaction:
    /// commit on success, rollback on any failure. Passing `false` means
    /// the caller already opened one; cascaded child saves run that way,
    /// and calling a child save directly without an open transaction
    /// forfeits atomicity.
    ///
    /// Constraint violations roll back and come home as a classified
    /// [`SaveReport`] failure rather than an error.
    ///
    /// # Errors
    ///
    /// Metadata defects and non-write driver failures propagate.
    pub fn save(&self, entity: &mut Entity, begin_transaction: bool) -> CoreResult<SaveReport> {
        if entity.name() != self.entity_name() {
            return Err(CoreError::invalid_argument(format!(
                "expected an entity of type `{}`, got `{}`",
                self.entity_name(),
                entity.name()
            )));
        }
        if !entity.is_modified() && entity.has_id() {
            trace!(entity = self.entity_name(), id = entity.id(), "save skipped, entity clean");
            return Ok(SaveReport::unchanged());
        }

        let driver = self.entity_manager().driver();
        if begin_transaction {
            driver.begin_transaction()?;
        }

        match self.save_tree(entity) {
            Ok(outcome) => {
                if begin_transaction {
                    driver.commit()?;
                }
                Ok(SaveReport {
                    outcome,
                    message: None,
                })
            }
            Err(CoreError::Driver(error)) => {
                if begin_transaction {
                    let _ = driver.rollback();
                }
                debug!(entity = self.entity_name(), %error, "save rolled back");
                Ok(report::classify(&error))
            }
            Err(other) => {
                if begin_transaction {
                    let _ = driver.rollback();
                }
                Err(other)
            }
        }
    }

    /// Writes the entity and its cascades, assuming an open transaction.
    /// Driver errors propagate for the transaction owner to classify.
    pub(crate) fn save_tree(&self, entity: &mut Entity) -> CoreResult<SaveOutcome> {
        if !entity.is_modified() && entity.has_id() {
            return Ok(SaveOutcome::Unchanged);
        }

        let plan = self.write_plan(entity);
        let driver = self.entity_manager().driver();
        let table = self.table();
        trace!(entity = self.entity_name(), ?plan, "write plan");

        let outcome = if let Some(id) = entity.id() {
            if !plan.bind.is_empty() {
                debug!(entity = self.entity_name(), table, id, "updating row");
                driver.update(
                    table,
                    &plan.bind,
                    &[Condition::bind(format!("{} = ?", self.primary_key()), id)],
                )?;
            }
            SaveOutcome::Updated
        } else {
            debug!(entity = self.entity_name(), table, "inserting row");
            driver.insert(table, &plan.bind)?;
            entity.set_id(driver.last_insert_id()?);
            SaveOutcome::Inserted
        };

        let parent_id = entity
            .id()
            .ok_or_else(|| CoreError::invalid_argument("driver assigned no identity on insert"))?;

        self.cascade_one_to_one(entity, &plan.one_to_one, parent_id)?;
        self.cascade_one_to_many(entity, &plan.one_to_many, parent_id)?;
        self.cascade_many_to_many(entity, &plan.many_to_many, parent_id)?;

        entity.refresh_snapshot();
        Ok(outcome)
    }

    /// Builds the insert/update bind and collects the cascade work lists.
    /// Fields with no value are skipped; the primary key never enters the
    /// bind.
    fn write_plan(&self, entity: &Entity) -> WritePlan {
        let mut plan = WritePlan::default();

        for field in &self.resolver().meta().fields {
            match &field.kind {
                FieldKind::Column { primary: true, .. } => {}
                FieldKind::Column { column, .. } => {
                    if let Some(value) = entity.scalar(&field.name) {
                        plan.bind.insert(column.clone(), value.clone().into_bind());
                    }
                }
                FieldKind::Relation {
                    kind,
                    target,
                    join_column,
                    join_table,
                    inverse,
                } => {
                    let descriptor = RelationshipDescriptor {
                        field: field.name.clone(),
                        kind: *kind,
                        target: target.clone(),
                        join_column: join_column.clone(),
                        join_table: join_table.clone(),
                        inverse: *inverse,
                    };
                    match kind {
                        RelationKind::OneToOne | RelationKind::ManyToOne => {
                            if let Some(join_column) = join_column {
                                let target_id = entity
                                    .related(&field.name)
                                    .and_then(Entity::id)
                                    .or_else(|| {
                                        entity
                                            .scalar(&descriptor.id_field())
                                            .and_then(Value::as_i64)
                                    });
                                if let Some(target_id) = target_id {
                                    plan.bind
                                        .insert(join_column.clone(), Value::Integer(target_id));
                                }
                            } else if *kind == RelationKind::OneToOne
                                && !inverse
                                && entity.related(&field.name).is_some()
                            {
                                plan.one_to_one.push(descriptor);
                            }
                        }
                        RelationKind::OneToMany => {
                            if entity
                                .collection(&field.name)
                                .is_some_and(|c| !c.is_empty())
                            {
                                plan.one_to_many.push(descriptor);
                            }
                        }
                        RelationKind::ManyToMany => {
                            // An attached empty set still clears join rows.
                            if entity.collection(&field.name).is_some() {
                                plan.many_to_many.push(descriptor);
                            }
                        }
                    }
                }
            }
        }
        plan
    }

    /// Saves unidirectional one-to-one targets, back-reference first.
    fn cascade_one_to_one(
        &self,
        entity: &mut Entity,
        descriptors: &[RelationshipDescriptor],
        parent_id: i64,
    ) -> CoreResult<()> {
        for descriptor in descriptors {
            let target_repo = self.entity_manager().repository(&descriptor.target)?;
            let back_field = target_repo
                .resolver()
                .owning_relation_referencing(self.entity_name())
                .map(RelationshipDescriptor::id_field)
                .ok_or_else(|| {
                    CoreError::missing_inverse(self.entity_name(), &descriptor.target)
                })?;
            if let Some(child) = entity.related_mut(&descriptor.field) {
                child.set(&back_field, parent_id)?;
                target_repo.save_tree(child)?;
            }
        }
        Ok(())
    }

    /// Saves one-to-many children with their foreign key pointed at the
    /// parent, sharing the parent's transaction.
    fn cascade_one_to_many(
        &self,
        entity: &mut Entity,
        descriptors: &[RelationshipDescriptor],
        parent_id: i64,
    ) -> CoreResult<()> {
        for descriptor in descriptors {
            let target_repo = self.entity_manager().repository(&descriptor.target)?;
            let back_field = target_repo
                .resolver()
                .owning_relation_referencing(self.entity_name())
                .map(RelationshipDescriptor::id_field)
                .ok_or_else(|| {
                    CoreError::missing_inverse(self.entity_name(), &descriptor.target)
                })?;
            if let Some(children) = entity.collection_mut(&descriptor.field) {
                for child in children.iter_mut() {
                    child.set(&back_field, parent_id)?;
                    target_repo.save_tree(child)?;
                }
            }
        }
        Ok(())
    }

    /// Replaces many-to-many join rows wholesale: delete every row for
    /// this id, then reinsert one per current target.
    fn cascade_many_to_many(
        &self,
        entity: &mut Entity,
        descriptors: &[RelationshipDescriptor],
        parent_id: i64,
    ) -> CoreResult<()> {
        let driver = self.entity_manager().driver();
        for descriptor in descriptors {
            let join = descriptor.join_table.as_ref().ok_or_else(|| {
                CoreError::missing_join_table(self.entity_name(), &descriptor.field)
            })?;
            debug!(
                entity = self.entity_name(),
                table = join.table.as_str(),
                parent_id,
                "replacing join rows"
            );
            driver.delete(
                &join.table,
                &[Condition::bind(
                    format!("{} = ?", join.local_column),
                    parent_id,
                )],
            )?;
            if let Some(children) = entity.collection(&descriptor.field) {
                for child in children {
                    let mut row = BTreeMap::new();
                    row.insert(join.local_column.clone(), Value::Integer(parent_id));
                    row.insert(join.target_column.clone(), Value::from(child.id()));
                    driver.insert(&join.table, &row)?;
                }
            }
        }
        Ok(())
    }

    /// Deletes the row with the given primary key.
    ///
    /// With `begin_transaction` the call owns a scoped transaction, like
    /// [`save`](Self::save); passing `false` shares one the caller
    /// already opened.
    ///
    /// A foreign-key rejection (the row is still referenced) rolls back
    /// the scoped transaction and is reported as a
    /// [`ConstraintKind::ForeignKeyInUse`] failure with a user-facing
    /// message; the row is left in place.
    ///
    /// [`ConstraintKind::ForeignKeyInUse`]: crate::repository::ConstraintKind::ForeignKeyInUse
    ///
    /// # Errors
    ///
    /// Transaction-control driver failures propagate.
    pub fn remove(&self, id: i64, begin_transaction: bool) -> CoreResult<SaveReport> {
        let driver = self.entity_manager().driver();
        if begin_transaction {
            driver.begin_transaction()?;
        }

        let condition = Condition::bind(format!("{} = ?", self.primary_key()), id);
        match driver.delete(self.table(), &[condition]) {
            Ok(()) => {
                if begin_transaction {
                    driver.commit()?;
                }
                debug!(entity = self.entity_name(), id, "row removed");
                Ok(SaveReport::removed())
            }
            Err(error) => {
                if begin_transaction {
                    let _ = driver.rollback();
                }
                debug!(entity = self.entity_name(), id, %error, "remove failed");
                Ok(report::classify(&error))
            }
        }
    }
}
